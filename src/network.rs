use anyhow::{anyhow, Context, Result};
use virtual_display::CommandRunner;

/// First address printed by `hostname -I`. Not validated.
pub async fn primary_ip<R: CommandRunner>(runner: &R) -> Result<String> {
    let out = runner
        .output("hostname", &["-I"])
        .await
        .context("Failed to get IP address.")?;
    if !out.success() {
        return Err(anyhow!("hostname -I exited with {:?}", out.code)
            .context("Failed to get IP address."));
    }
    out.stdout
        .split_whitespace()
        .next()
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("hostname -I printed no address").context("Failed to get IP address."))
}
