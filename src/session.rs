//! The orchestrator: create the headless output, configure it, optionally
//! serve it over VNC, then wait for Ctrl-C and tear it all down.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use virtual_display::{CommandRunner, Hyprctl, HYPRCTL};

use crate::config;
use crate::network;
use crate::tools;
use crate::vnc::{VncServer, WAYVNC};

/// Where the session is in its setup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Idle,
    ToolsChecked,
    OutputCreated,
    OutputNamed,
    OutputConfigured,
    ServerStarted,
    Waiting,
    Cleanup,
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Name of the headless output, set once it is known. Shared between the
/// setup sequence and the interrupt path, which treats an empty slot as
/// nothing to remove.
#[derive(Debug, Clone, Default)]
pub struct OutputSlot(Arc<OnceLock<String>>);

impl OutputSlot {
    /// Records the name. Returns false if one was already recorded.
    pub fn set(&self, name: String) -> bool {
        self.0.set(name).is_ok()
    }

    pub fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }
}

pub struct Session<R> {
    runner: R,
    hyprctl: Hyprctl<R>,
    config_path: Option<PathBuf>,
    vnc_enabled: bool,
    output: OutputSlot,
    vnc: Option<VncServer>,
    phase: Phase,
}

impl<R: CommandRunner + Clone> Session<R> {
    pub fn new(runner: R, config_path: Option<PathBuf>, vnc_enabled: bool) -> Self {
        Self {
            hyprctl: Hyprctl::new(runner.clone()),
            runner,
            config_path,
            vnc_enabled,
            output: OutputSlot::default(),
            vnc: None,
            phase: Phase::Idle,
        }
    }

    pub fn output(&self) -> &OutputSlot {
        &self.output
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, phase: Phase) {
        log::debug!("{} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Runs the whole session. Setup is abandoned as soon as `interrupt`
    /// resolves; cleanup then runs with whatever state exists. A setup error
    /// also runs cleanup before being returned.
    pub async fn run<F>(mut self, interrupt: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);

        let started = tokio::select! {
            biased;
            res = self.start() => Some(res),
            _ = &mut interrupt => None,
        };

        match started {
            None => {
                log::info!("Exiting script...");
                self.cleanup().await;
                Ok(())
            }
            Some(Err(e)) => {
                self.cleanup().await;
                Err(e)
            }
            Some(Ok(())) => {
                self.advance(Phase::Waiting);
                let mut interrupted = false;
                if let Some(vnc) = self.vnc.as_mut() {
                    tokio::select! {
                        _ = &mut interrupt => interrupted = true,
                        status = vnc.exited() => match status {
                            Ok(status) => log::warn!("wayvnc exited on its own ({})", status),
                            Err(e) => log::warn!("Lost track of wayvnc: {}", e),
                        },
                    }
                }
                if !interrupted {
                    interrupt.await;
                }
                log::info!("Exiting script...");
                self.cleanup().await;
                Ok(())
            }
        }
    }

    /// Setup sequence up to the point where the session only has to wait.
    pub async fn start(&mut self) -> Result<()> {
        tools::ensure_installed(&self.runner, HYPRCTL).await?;
        if self.vnc_enabled {
            tools::ensure_installed(&self.runner, WAYVNC).await?;
        }
        self.advance(Phase::ToolsChecked);

        let settings = config::load(self.config_path.as_deref())?;

        self.hyprctl.create_headless_output().await?;
        self.advance(Phase::OutputCreated);

        let name = self.hyprctl.headless_output_name().await?;
        self.output.set(name.clone());
        self.advance(Phase::OutputNamed);

        self.hyprctl
            .configure_output(&name, &settings.resolution, &settings.position, &settings.scale)
            .await?;
        self.advance(Phase::OutputConfigured);

        if self.vnc_enabled {
            let server = VncServer::start(&self.runner, &name)?;
            log::debug!("wayvnc pid {:?}", server.id());
            log::info!("VNC server started on the headless output ({}).", server.output());
            self.vnc = Some(server);
            self.advance(Phase::ServerStarted);

            let ip = network::primary_ip(&self.runner).await?;
            log::info!("Your IP address is: {}", ip);
        } else {
            log::info!("Headless output ({}) created without VNC server.", name);
        }
        Ok(())
    }

    /// Stops the VNC server and removes the headless output if one was
    /// recorded. Never fails.
    pub async fn cleanup(&mut self) {
        self.advance(Phase::Cleanup);

        if let Some(mut vnc) = self.vnc.take() {
            vnc.stop().await;
        }

        if let Some(name) = self.output.get() {
            match self.hyprctl.remove_output(name).await {
                Ok(true) => log::info!("Removed headless output ({}).", name),
                Ok(false) => log::warn!("Could not remove headless output ({}).", name),
                Err(e) => log::warn!("Could not remove headless output ({}): {:#}", name, e),
            }
        }
        self.advance(Phase::Terminated);
    }
}
