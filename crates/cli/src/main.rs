use anyhow::Context;
use bookstore_kernel::settings::{BackendMode, Settings};
use clap::{Parser, Subcommand};

/// Bookstore catalog service
#[derive(Debug, Parser)]
#[command(name = "bookstore", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Port to listen on, overriding configuration
        #[arg(long)]
        port: Option<u16>,
        /// Serve from the in-process store or proxy to an external backend
        #[arg(long, value_parser = parse_mode)]
        mode: Option<BackendMode>,
    },
    /// Print the resolved settings as JSON
    Settings,
}

fn parse_mode(value: &str) -> Result<BackendMode, String> {
    value.parse().map_err(|err: anyhow::Error| err.to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load bookstore settings")?;

    match cli.command {
        Command::Serve { port, mode } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            if let Some(mode) = mode {
                settings.backend.mode = mode;
            }

            bookstore_telemetry::init(&settings.telemetry)?;
            tracing::info!(
                env = ?settings.environment,
                mode = ?settings.backend.mode,
                "bookstore CLI starting service"
            );

            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            runtime.block_on(bookstore_app::app::run(settings))
        }
        Command::Settings => {
            let rendered =
                serde_json::to_string_pretty(&settings).context("failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
    }
}
