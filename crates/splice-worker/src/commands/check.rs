//! Check tool availability.

use splice_media::check_tool;
use splice_worker::WorkerConfig;

pub fn run(config: &WorkerConfig) -> anyhow::Result<()> {
    println!("Splice System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;
    for (label, program) in [("ffmpeg", &config.ffmpeg_bin), ("ffprobe", &config.ffprobe_bin)] {
        match check_tool(program) {
            Ok(path) => println!("[OK] {}: {}", label, path.display()),
            Err(e) => {
                all_ok = false;
                println!("[MISSING] {}: {}", label, e);
            }
        }
    }

    println!();
    if all_ok {
        println!("All required tools are available.");
        Ok(())
    } else {
        anyhow::bail!("required tools are missing")
    }
}
