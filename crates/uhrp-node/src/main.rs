use clap::Parser;
use tracing::debug;
use uhrp_logging::UhrpSubscriberBuilder;
use uhrp_node::commands;
use uhrp_node::config::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    let _guard = UhrpSubscriberBuilder::new()
        .with_config(config.log.clone())
        .init();
    debug!(
        topic = %config.overlay.topic,
        db = %config.overlay.storage.db_path.display(),
        "Loaded configuration"
    );

    let mut stdout = std::io::stdout();
    commands::execute(&cli.command, &config.overlay, &mut stdout).await
}
