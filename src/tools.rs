use anyhow::{bail, Result};
use virtual_display::CommandRunner;

/// Fails unless `which` can resolve `tool` on the current `PATH`.
pub async fn ensure_installed<R: CommandRunner>(runner: &R, tool: &str) -> Result<()> {
    let found = match runner.output("which", &[tool]).await {
        Ok(out) => out.success(),
        Err(e) => {
            log::debug!("which {} could not run: {:#}", tool, e);
            false
        }
    };
    if !found {
        bail!("{} could not be found, please install it.", tool);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use virtual_display::testing::FakeRunner;

    #[tokio::test]
    async fn present_tool_passes() {
        let runner = FakeRunner::new().respond("which hyprctl", 0, "/usr/bin/hyprctl\n");
        ensure_installed(&runner, "hyprctl").await.unwrap();
    }

    #[tokio::test]
    async fn absent_tool_is_named_in_error() {
        let runner = FakeRunner::new().respond("which wayvnc", 1, "");
        let err = ensure_installed(&runner, "wayvnc").await.unwrap_err();
        assert_eq!(err.to_string(), "wayvnc could not be found, please install it.");
    }

    #[tokio::test]
    async fn unusable_probe_counts_as_absent() {
        let runner = FakeRunner::new().missing("which hyprctl");
        assert!(ensure_installed(&runner, "hyprctl").await.is_err());
    }
}
