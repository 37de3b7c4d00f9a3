//! Print clip metadata.

use std::path::PathBuf;

use anyhow::Context;
use splice_worker::{JoinCoordinator, WorkerConfig};

pub async fn run(config: WorkerConfig, files: Vec<PathBuf>, no_thumbnails: bool) -> anyhow::Result<()> {
    let mut coordinator = JoinCoordinator::new(config);
    if no_thumbnails {
        coordinator = coordinator.without_thumbnails();
    }

    let mut infos = Vec::with_capacity(files.len());
    for file in &files {
        let clip = coordinator
            .probe_clip(file)
            .await
            .with_context(|| format!("failed to probe {}", file.display()))?;
        infos.push(clip.info());
    }

    println!("{}", serde_json::to_string_pretty(&infos)?);
    Ok(())
}
