use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use eyre::{Context, Result};
use thiserror::Error;
use tokio::{fs::write, process::Command};
use tracing::{debug, warn};
use walkdir::WalkDir;

const DROP_CACHES_PATH: &str = "/proc/sys/vm/drop_caches";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    RunError {
        program: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
}

/// Runs `program` to completion and returns its stdout. A non-zero exit is an error.
pub async fn simple_command_with_output(
    program: &str,
    args: &[&str],
) -> Result<String, CommandError> {
    debug!("Running {program} {}", args.join(" "));
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program.to_owned(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        return Err(CommandError::RunError {
            program: program.to_owned(),
            status: output.status,
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(stdout)
}

/// Flushes dirty pages and asks the kernel to drop its caches.
///
/// Usually needs root, failures are only logged.
pub async fn drop_caches() {
    if let Err(err) = simple_command_with_output("sync", &[]).await {
        warn!("Failed to sync before dropping caches: {err}");
        return;
    }
    if let Err(err) = write(DROP_CACHES_PATH, "3").await {
        warn!("Failed to drop caches: {err}");
    }
}

/// Recursively collects every file called `filename` below `dir`, in path order.
pub fn find_files(dir: &Path, filename: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.context(format!("Walking {}", dir.display()))?;
        if entry.file_type().is_file() && entry.file_name() == filename {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
