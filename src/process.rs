use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Runs `program args..` to completion, capturing output. The child is killed
/// when `timeout` elapses.
pub(crate) async fn run_cmd<I, S>(program: &str, args: I, timeout: Duration) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .with_context(|| format!("Command execution failed: {}", program))?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output.with_context(|| format!("{} did not complete", program)),
        Err(_) => anyhow::bail!("{} timed out after {}s", program, timeout.as_secs()),
    }
}

/// Like [`run_cmd`] but non-zero exit status is an error carrying the tail of
/// stderr.
pub(crate) async fn run_checked<I, S>(program: &str, args: I, timeout: Duration) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_cmd(program, args, timeout).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr.chars().rev().take(200).collect::<Vec<_>>().into_iter().rev().collect();
        anyhow::bail!("{} failed ({}): {}", program, output.status, tail.trim());
    }
    Ok(output)
}

/// True when `program probe_arg` runs and exits successfully within 10s.
pub(crate) async fn program_available(program: &str, probe_arg: &str) -> bool {
    match run_cmd(program, [probe_arg], Duration::from_secs(10)).await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        assert!(!program_available("definitely-not-a-real-binary-4242", "-version").await);
    }

    #[tokio::test]
    async fn missing_program_errors() {
        let err = run_cmd("definitely-not-a-real-binary-4242", ["x"], Duration::from_secs(1)).await;
        assert!(err.is_err());
    }
}
