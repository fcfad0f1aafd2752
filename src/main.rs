use anyhow::Result;
use is_terminal::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zonecrab::{Config, GitSolver, Shared, Solver};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let config_file = std::env::args().nth(1);
    let config = config_init(config_file)?;

    let solver = GitSolver::from_config(&config)?;
    solver.initialize().await?;
    tracing::info!("{} ready", solver.name());

    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = zonecrab::api::new(config.clone(), Arc::new(solver));
    let api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(api_res) = api_handle => {
            if let Err(err) = api_res {
                return Err(err.into())
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(std::io::stdout().is_terminal()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zonecrab=info".into()),
        )
        .init();
}

fn config_init(config_file: Option<String>) -> Result<Shared> {
    let config = match config_file {
        None => {
            tracing::debug!("loading config from environment");
            Config::try_from_env()?
        }
        Some(config_file) => {
            tracing::debug!("loading config from {config_file}");
            Config::try_from_file(&config_file)?
        }
    };
    Ok(Arc::new(config))
}
