use std::process::ExitStatus;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use virtual_display::CommandRunner;

pub const WAYVNC: &str = "wayvnc";

// Short flags exactly as the server has always been launched with, followed by
// the output name the `-o` flag takes.
const WAYVNC_FLAGS: &str = "-gdo";

/// A wayvnc process serving one output. Killed on drop.
pub struct VncServer {
    child: Child,
    output: String,
}

impl VncServer {
    /// Launches wayvnc bound to `output` and returns without waiting for it.
    ///
    /// Only an exit that has already happened by the time this returns is
    /// caught here; a server that dies later shows up through [`Self::exited`].
    pub fn start<R: CommandRunner>(runner: &R, output: &str) -> Result<Self> {
        let mut child = runner
            .spawn(WAYVNC, &[WAYVNC_FLAGS, output])
            .context("Failed to start wayvnc server.")?;

        if let Some(status) = child.try_wait().context("Failed to start wayvnc server.")? {
            if !status.success() {
                bail!("Failed to start wayvnc server. ({})", status);
            }
        }

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => log::debug!("wayvnc: {}", line),
                        Ok(None) => break,
                        Err(e) => {
                            log::debug!("Failed to read wayvnc output: {}", e);
                            break;
                        }
                    }
                }
            });
        }

        Ok(Self {
            child,
            output: output.to_owned(),
        })
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Resolves when the server exits on its own.
    pub async fn exited(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Kills the server if it is still running and reaps it.
    pub async fn stop(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                log::debug!("wayvnc already exited ({})", status);
                return;
            }
            Ok(None) => {}
            Err(e) => log::debug!("Failed to poll wayvnc: {}", e),
        }
        if let Err(e) = self.child.kill().await {
            log::warn!("Failed to stop wayvnc server: {}", e);
        } else {
            log::debug!("Stopped wayvnc server on {}", self.output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use virtual_display::testing::FakeRunner;

    #[tokio::test]
    async fn launches_with_output_binding() {
        let runner = FakeRunner::new();
        let mut server = VncServer::start(&runner, "HEADLESS-2").unwrap();
        assert_eq!(runner.calls(), vec!["wayvnc -gdo HEADLESS-2"]);
        assert_eq!(server.output(), "HEADLESS-2");
        assert!(server.id().is_some());
        server.stop().await;
        assert!(server.child.try_wait().unwrap().is_some());
    }

    #[tokio::test]
    async fn early_non_zero_exit_is_fatal() {
        let runner = FakeRunner::new().spawn_exits(WAYVNC, 1);
        let err = VncServer::start(&runner, "HEADLESS-2").err().unwrap();
        assert!(err.to_string().contains("Failed to start wayvnc server"));
    }

    #[tokio::test]
    async fn early_clean_exit_is_not_fatal() {
        let runner = FakeRunner::new().spawn_exits(WAYVNC, 0);
        let mut server = VncServer::start(&runner, "HEADLESS-2").unwrap();
        assert!(server.exited().await.unwrap().success());
    }

    #[tokio::test]
    async fn spawn_failure_is_fatal() {
        let runner = FakeRunner::new().fail_spawn(WAYVNC);
        let err = VncServer::start(&runner, "HEADLESS-2").err().unwrap();
        assert!(err.to_string().contains("Failed to start wayvnc server"));
    }
}
