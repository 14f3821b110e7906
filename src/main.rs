use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use tokio::signal::unix::{signal, SignalKind};
use virtual_display::SystemRunner;

pub mod config;
pub mod network;
pub mod session;
pub mod tools;
pub mod vnc;

use session::Session;

/// Create a virtual second screen and optionally start a VNC server.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Do not start the wayvnc server
    #[arg(short, long)]
    no_vnc: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stdout)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    // Registered before anything touches the compositor.
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install Ctrl-C handler")?;
    let interrupt = async move {
        sigint.recv().await;
    };

    Session::new(SystemRunner, config::config_path(), !cli.no_vnc)
        .run(interrupt)
        .await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger();

    if let Err(e) = run(cli).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
