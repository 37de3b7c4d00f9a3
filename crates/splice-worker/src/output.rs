//! Output file naming.

use chrono::{DateTime, Utc};

use crate::error::{WorkerError, WorkerResult};

const OUTPUT_EXTENSION: &str = ".mp4";

/// Resolve the output file name for a job.
///
/// Without a request the name is `concatenated_YYYYMMDD_HHMMSS.mp4`. A
/// requested name gets `.mp4` appended when missing and must be a bare file
/// name: separators and `..` are rejected.
pub fn output_file_name(requested: Option<&str>, now: DateTime<Utc>) -> WorkerResult<String> {
    let requested = requested.map(str::trim).filter(|s| !s.is_empty());

    let Some(name) = requested else {
        return Ok(format!(
            "concatenated_{}{}",
            now.format("%Y%m%d_%H%M%S"),
            OUTPUT_EXTENSION
        ));
    };

    if name.contains(['/', '\\', '\0']) || name.contains("..") {
        return Err(WorkerError::invalid_request(format!(
            "output filename must be a plain file name: {:?}",
            name
        )));
    }

    if name.to_ascii_lowercase().ends_with(OUTPUT_EXTENSION) {
        Ok(name.to_string())
    } else {
        Ok(format!("{}{}", name, OUTPUT_EXTENSION))
    }
}
