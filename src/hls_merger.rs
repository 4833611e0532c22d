//! Merges downloaded HLS segments into a single file via an external
//! ffmpeg-compatible binary.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::utils::constants::{FFMPEG_CHECK_TIMEOUT_SECS, HLS_MERGE_TIMEOUT_SECS};

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("merger I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("merge timed out after {0}s")]
    Timeout(u64),
    #[error("merger exited with status {0}: {1}")]
    NonZeroExit(i32, String),
}

/// Check whether the configured merger binary is on PATH and runnable.
pub async fn is_available(binary: &str) -> bool {
    let check = tokio::time::timeout(
        Duration::from_secs(FFMPEG_CHECK_TIMEOUT_SECS),
        Command::new(binary).arg("-version").output(),
    )
    .await;

    matches!(check, Ok(Ok(output)) if output.status.success())
}

/// Merge `segments` (already-downloaded `.ts` files, in order) into
/// `output_path` using `merger -f concat -safe 0 -i <filelist> -c copy -y
/// <output>`. Availability of `binary` is the caller's responsibility to
/// check once up front (see `is_available`); this function assumes it is
/// already known to be runnable.
pub async fn merge_segments(binary: &str, segments: &[PathBuf], output_path: &Path) -> Result<(), MergeError> {
    let segment_dir = segments[0].parent().unwrap_or_else(|| Path::new("."));

    let mut filelist = NamedTempFile::new_in(segment_dir)?;
    for segment in segments {
        let line = format!("file '{}'\n", segment.display().to_string().replace('\\', "/"));
        filelist.write_all(line.as_bytes())?;
    }
    filelist.flush()?;
    let list_path = filelist.into_temp_path();

    let mut cmd = Command::new(binary);
    cmd.args(["-f", "concat", "-safe", "0", "-i"])
        .arg(&list_path)
        .args(["-c", "copy", "-y"])
        .arg(output_path);

    let run = tokio::time::timeout(Duration::from_secs(HLS_MERGE_TIMEOUT_SECS), cmd.output()).await;

    let _ = list_path.close();

    let output = match run {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(MergeError::Io(e)),
        Err(_) => return Err(MergeError::Timeout(HLS_MERGE_TIMEOUT_SECS)),
    };

    if !output.status.success() {
        return Err(MergeError::NonZeroExit(
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_surfaces_as_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let segment = dir.path().join("seg0.ts");
        tokio::fs::write(&segment, b"x").await.unwrap();
        let result = merge_segments("definitely-not-a-real-binary", &[segment], &dir.path().join("out.mp4")).await;
        assert!(matches!(result, Err(MergeError::Io(_))));
    }

    #[tokio::test]
    async fn is_available_false_for_missing_binary() {
        assert!(!is_available("definitely-not-a-real-binary").await);
    }
}
