use anyhow::{Context, Result};
use clap::Parser;
use hwmon_config::{ConfigLoader, LoggingConfig};
use hwmon_server::{api, app};
use hwmon_shutdown::SignalHandler;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Host hardware monitor", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config/hwmon.toml")]
    config: PathBuf,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

fn init_tracing(config: &LoggingConfig) {
    // RUST_LOG 优先于配置文件
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", ConfigLoader::render_default()?);
        return Ok(());
    }

    let (config, warnings) = ConfigLoader::new(&args.config)
        .load()
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    init_tracing(&config.logging);
    info!("Starting hwmon with config: {}", args.config.display());
    for warning in warnings {
        warn!("Config: {}", warning);
    }

    let (state, monitor) = app::build(&config).await?;

    let (signal_handler, mut shutdown_rx) = SignalHandler::new();
    let _listener = Arc::new(signal_handler).listen();

    let monitor_handle = monitor.spawn();

    let (drain_tx, drain_rx) = oneshot::channel::<()>();
    let server = if config.server.enabled {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid server address {}:{}",
                    config.server.host, config.server.port
                )
            })?;
        let router = api::create_router(state.clone());
        info!("HTTP listening on {}", addr);

        Some(tokio::spawn(async move {
            axum::Server::try_bind(&addr)?
                .serve(router.into_make_service())
                .with_graceful_shutdown(async move {
                    let _ = drain_rx.await;
                })
                .await?;
            Ok::<(), anyhow::Error>(())
        }))
    } else {
        info!("HTTP server disabled");
        None
    };

    let _ = shutdown_rx.recv().await;

    // 先停监控循环，让进行中的分发完成或超时，再关闭 HTTP
    monitor_handle.shutdown().await;
    let _ = drain_tx.send(());

    if let Some(server) = server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("HTTP server error: {}", e),
            Err(e) => error!("HTTP server task panicked: {}", e),
        }
    }

    info!("hwmon stopped");
    Ok(())
}
