use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use wisun_bragentd::bus::BusBridge;
use wisun_bragentd::config::{self, DEFAULT_SERVICE_PORT, DEFAULT_SOC_PORT};
use wisun_bragentd::server::AgentServer;
use wisun_bragentd::{Result, Session, SocClient, APP_NAME, VERSION};

#[derive(Parser, Debug)]
#[command(name = "bragentd", version, about = "Wi-SUN SoC border router bridge agent")]
struct Args {
    /// Path to the startup configuration file
    #[arg(short, long, default_value = "/etc/bragentd.conf")]
    config: PathBuf,

    /// Port the inbound service listener binds
    #[arg(long, default_value_t = DEFAULT_SERVICE_PORT)]
    service_port: u16,

    /// Port of the SoC control link
    #[arg(long, default_value_t = DEFAULT_SOC_PORT)]
    soc_port: u16,

    /// Initial IPv6 address of the SoC
    #[arg(long, default_value = "::1")]
    soc_address: String,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);
    println!("{APP_NAME} {VERSION} starting");

    if let Err(err) = run(args).await {
        error!("fatal: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let session = Session::new(args.soc_port);
    let settings = config::load_or_default(&args.config)?;
    session
        .set_endpoint(&args.soc_address, Some(settings))
        .await?;

    let client = SocClient::new(session.clone());
    let (bridge, notifier) = BusBridge::channel(session.clone(), client);

    let server = AgentServer::start(session, Some(notifier), args.service_port).await?;

    let cancel = CancellationToken::new();
    let bridge_task = tokio::spawn(bridge.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    cancel.cancel();
    server.stop().await;
    if let Err(err) = bridge_task.await {
        error!("bridge task join failed: {err}");
    }
    info!("{APP_NAME} stopped");
    Ok(())
}
