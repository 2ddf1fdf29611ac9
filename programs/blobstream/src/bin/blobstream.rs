use blobstream::{
    cli::{Cli, Commands, KeysCommands, OrchestratorCommands, RelayerCommands, StoreCommands},
    config::Config,
    metrics,
    observability::{init_observability, ObservabilityGuard},
    runners,
};
use clap::Parser;

fn init(config: &Config) -> anyhow::Result<ObservabilityGuard> {
    let guard = init_observability(&config.observability)?;
    tracing::info!(level = %config.observability.level(), "Observability initialized");
    if config.metrics.enabled {
        metrics::spawn_server(config.metrics.listen_addr);
    }
    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    dotenv::dotenv().ok();

    match Cli::parse().command {
        Commands::Orchestrator(OrchestratorCommands::Start(args)) => {
            let config = Config::from_file(&args.config)?;
            let password = runners::keystore_password()?;
            let _guard = init(&config)?;
            runners::orchestrator::run(&config, &password, runners::shutdown_token()).await
        }
        Commands::Relayer(RelayerCommands::Start(args)) => {
            let config = Config::from_file(&args.config)?;
            let password = runners::keystore_password()?;
            let _guard = init(&config)?;
            runners::relayer::run(&config, &password, runners::shutdown_token()).await
        }
        Commands::Store(StoreCommands::Serve(args)) => {
            let config = Config::from_file(&args.config)?;
            let _guard = init(&config)?;
            runners::store::run(&config, runners::shutdown_token()).await
        }
        Commands::Keys(KeysCommands::Add(args)) => {
            let address = runners::keys::add(&args)?;
            println!("{address}");
            Ok(())
        }
        Commands::Keys(KeysCommands::Show(args)) => {
            let address = runners::keys::show(&args)?;
            println!("{address}");
            Ok(())
        }
    }
}
