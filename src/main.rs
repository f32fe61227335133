use clap::Parser;

use strata::cli::{self, Cli, Commands};
use strata::logger::{LoggerConfig, build_subscriber, init_logger};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.selected_command() {
        Commands::Keys => print!("{}", cli::render_keys(&cli.env_prefix)),
        Commands::Show { output } => {
            let bootstrap = build_subscriber(&cli.bootstrap_logger())?;
            let config =
                tracing::subscriber::with_default(bootstrap, || cli::resolve(&cli.loader()))?;

            let mut logger = LoggerConfig::try_from(&config.observability.logging)?;
            if let Some(level) = cli.log_level {
                logger.level = level.into();
            }
            init_logger(&logger)?;

            tracing::info!(
                address = %config.server.address(),
                env_prefix = %cli.env_prefix,
                "Configuration resolved"
            );

            println!("{}", cli::render(&config, output)?);
        }
    }

    Ok(())
}
