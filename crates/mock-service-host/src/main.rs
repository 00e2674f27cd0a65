use clap::Parser;
use mock_service_host::admin_api::AdminApiServer;
use mock_service_host::responder::ExampleResponder;
use mock_service_host::{Config, Coordinator, MockServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "mock-service-host", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "MOCK_CONFIG")]
    config: Option<PathBuf>,
    /// Port of the first mock listener
    #[arg(short, long, env = "MOCK_PORT")]
    port: Option<u16>,
    /// Directory the API specifications are loaded from
    #[arg(long, env = "MOCK_SPEC_DIR")]
    spec_dir: Option<PathBuf>,
    /// Admin API port
    #[arg(long, env = "MOCK_ADMIN_PORT")]
    admin_port: Option<u16>,
    /// Log filter (overrides RUST_LOG), e.g. `debug` or `mock_service_host=trace`
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "mock_service_host=info".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(args: &Args) -> Result<Config, anyhow::Error> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Config::from_file(path)?
        }
        None => Config::default(),
    };

    if let Some(port) = args.port {
        if let Some(first) = config.listeners.first_mut() {
            first.port = port;
        }
    }
    if let Some(dir) = &args.spec_dir {
        config.specs.directory = dir.clone();
    }
    if let Some(port) = args.admin_port {
        config.admin.port = port;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let config = Arc::new(load_config(&args)?);
    let coordinator = Arc::new(Coordinator::new(
        Arc::clone(&config),
        Arc::new(ExampleResponder::new()),
    ));

    let mut servers = Vec::with_capacity(config.listeners.len());
    for listener in &config.listeners {
        servers.push(MockServer::bind(listener, Arc::clone(&coordinator)).await?);
    }
    for server in servers {
        let addr = server.local_addr();
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Mock listener on {} stopped: {}", addr, e);
            }
        });
    }

    if config.admin.enabled {
        let admin = AdminApiServer::bind(
            &config.admin.host,
            config.admin.port,
            Arc::clone(&coordinator),
        )
        .await?;
        tokio::spawn(async move {
            if let Err(e) = admin.run().await {
                error!("Admin API stopped: {}", e);
            }
        });
    }

    // listeners answer 503 until the specs are loaded
    coordinator.initialize().await;
    info!("{}", coordinator.validator_status());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}
