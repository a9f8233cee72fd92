//! Post-processing hook invocation.
//!
//! An optional external command run after each successful job with the
//! audio path, metadata path, and a literal `"1"`. The hook is opaque: no
//! stdin, output captured into the service log, and a non-zero exit is
//! logged without failing the job.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{info, warn};

/// Run the hook for a finished job.
pub fn run(script: &Path, audio_file: &Path, metadata_file: &Path) {
    if !script.exists() {
        warn!(script = %script.display(), "hook script does not exist, skipping");
        return;
    }

    let output = Command::new(script)
        .arg(audio_file)
        .arg(metadata_file)
        .arg("1")
        .stdin(Stdio::null())
        .output();

    match output {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !stdout.trim().is_empty() {
                info!(script = %script.display(), output = %stdout.trim(), "hook stdout");
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                warn!(script = %script.display(), output = %stderr.trim(), "hook stderr");
            }
            if !output.status.success() {
                warn!(
                    script = %script.display(),
                    status = output.status.code().unwrap_or(-1),
                    "hook exited non-zero"
                );
            }
        }
        Err(e) => {
            warn!(script = %script.display(), error = %e, "hook could not be run");
        }
    }
}
