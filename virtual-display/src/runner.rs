use std::future::Future;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};

/// Captured result of a finished external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Everything this crate (and the binary on top of it) does to the outside
/// world goes through a runner, so the whole sequence can be replayed against
/// a scripted fake.
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion and capture its output. An `Err` means the
    /// process could not be started at all; a non-zero exit is reported through
    /// [`CommandOutput::code`].
    fn output(
        &self,
        program: &str,
        args: &[&str],
    ) -> impl Future<Output = Result<CommandOutput>> + Send;

    /// Start `program` in the background without waiting for it. The child is
    /// killed when the returned handle is dropped, and runs in its own process
    /// group so a terminal Ctrl-C reaches only this process.
    fn spawn(&self, program: &str, args: &[&str]) -> Result<Child>;
}

/// Runs real processes through tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        log::debug!("running: {} {}", program, args.join(" "));
        let out = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", program))?;

        Ok(CommandOutput {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }

    fn spawn(&self, program: &str, args: &[&str]) -> Result<Child> {
        log::debug!("spawning: {} {}", program, args.join(" "));
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let out = SystemRunner.output("sh", &["-c", "echo hi; exit 3"]).await.unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "hi");
        assert!(!out.success());
    }

    #[tokio::test]
    async fn background_child_leads_its_own_process_group() {
        let mut child = SystemRunner.spawn("sleep", &["5"]).unwrap();
        let pid = child.id().unwrap();
        let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).unwrap();
        // Fields after the parenthesised command name: state, ppid, pgrp.
        let pgrp: u32 = stat
            .rsplit_once(')')
            .unwrap()
            .1
            .split_whitespace()
            .nth(2)
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(pgrp, pid);
        child.kill().await.unwrap();
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let res = SystemRunner
            .output("definitely-not-a-real-program-xyz", &[])
            .await;
        assert!(res.is_err());
    }
}
