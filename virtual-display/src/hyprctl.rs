use anyhow::{anyhow, bail, Result};

use crate::runner::{CommandOutput, CommandRunner};

pub const HYPRCTL: &str = "hyprctl";

/// Marker Hyprland puts in the name of every headless output.
pub const HEADLESS_TAG: &str = "HEADLESS";

/// Client for Hyprland's control utility, one `hyprctl` invocation per call.
#[derive(Debug, Clone)]
pub struct Hyprctl<R> {
    runner: R,
}

impl<R: CommandRunner> Hyprctl<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn call(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner.output(HYPRCTL, args).await
    }

    /// Checked call: a non-zero exit becomes `failure`.
    async fn checked(&self, args: &[&str], failure: &'static str) -> Result<String> {
        let out = self.call(args).await.map_err(|e| e.context(failure))?;
        if !out.success() {
            let detail = out.stderr.trim();
            if detail.is_empty() {
                bail!(failure);
            }
            return Err(anyhow!("{}", detail.to_owned()).context(failure));
        }
        Ok(out.stdout)
    }

    pub async fn create_headless_output(&self) -> Result<()> {
        self.checked(&["output", "create", "headless"], "Failed to create headless output.")
            .await?;
        Ok(())
    }

    /// Name of the headless output as reported by `hyprctl monitors`.
    pub async fn headless_output_name(&self) -> Result<String> {
        let listing = self
            .checked(&["monitors"], "Failed to get monitors.")
            .await?;
        headless_output_name(&listing).ok_or_else(|| anyhow!("Failed to find headless output."))
    }

    /// Applies `<name>,<resolution>,<position>,<scale>` as a monitor rule. The
    /// values are handed to Hyprland untouched.
    pub async fn configure_output(
        &self,
        name: &str,
        resolution: &str,
        position: &str,
        scale: &str,
    ) -> Result<()> {
        let rule = monitor_rule(name, resolution, position, scale);
        self.checked(
            &["keyword", "monitor", &rule],
            "Failed to configure output resolution.",
        )
        .await?;
        Ok(())
    }

    /// Best effort. Returns whether hyprctl reported success; only a failure to
    /// run hyprctl at all is an `Err`.
    pub async fn remove_output(&self, name: &str) -> Result<bool> {
        let out = self.call(&["output", "remove", name]).await?;
        if !out.success() {
            log::warn!(
                "hyprctl output remove {} exited with {:?}: {}",
                name,
                out.code,
                out.stderr.trim()
            );
        }
        Ok(out.success())
    }
}

pub fn monitor_rule(name: &str, resolution: &str, position: &str, scale: &str) -> String {
    format!("{},{},{},{}", name, resolution, position, scale)
}

/// Second whitespace-separated token of the first listing line that mentions
/// a headless output, e.g. `Monitor HEADLESS-2 (ID 1):` gives `HEADLESS-2`.
pub fn headless_output_name(listing: &str) -> Option<String> {
    listing
        .lines()
        .find(|line| line.contains(HEADLESS_TAG))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_owned)
}
