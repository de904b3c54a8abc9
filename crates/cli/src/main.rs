use anyhow::Context;
use clap::{Parser, Subcommand};

use bookshelf_app::Application;
use bookshelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Book catalog service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render settings")?;
            println!("{}", rendered);
        }
        Command::Migrate => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            let app = Application::build(settings).await?;
            let applied = app.migrate().await?;
            app.close().await;
            tracing::info!(applied, "migrate finished");
        }
        Command::Serve => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "bookshelf CLI serving");
            let app = Application::build(settings).await?;
            app.run(bookshelf_http::shutdown_signal()).await?;
        }
    }

    Ok(())
}
