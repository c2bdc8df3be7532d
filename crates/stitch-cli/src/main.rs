//! tracestitch - Serverless trace reconstruction and log correlation
//!
//! Resolves an activation id, URL, or CDN request id into an ordered call
//! tree enriched with correlated log lines.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use stitch_core::config::ConfigLoader;
use stitch_core::Span;
use stitch_engine::Engine;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "stitch")]
#[command(version)]
#[command(about = "Serverless trace reconstruction and log correlation", long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "STITCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct the trace for an identifier and print it
    Trace {
        /// Activation id, URL, or CDN request id
        id: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Serve the trace API over HTTP
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ConfigLoader::new().with_cli_path(cli.config.clone()).load()?;

    match cli.command {
        Commands::Trace { id, format } => {
            let engine = Engine::new(&config);
            let spans = engine.reconstruct(&id).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&spans)?);
                }
                OutputFormat::Text => print_spans(&spans),
            }
            Ok(())
        }
        Commands::Serve { host, port } => {
            let mut web = config.web.clone();
            if let Some(host) = host {
                web.host = host;
            }
            if let Some(port) = port {
                web.port = port;
            }

            let engine = Engine::new(&config);
            info!("Starting trace API on {}:{}", web.host, web.port);
            stitch_web::start_server(web, engine).await
        }
    }
}

/// Print the call tree, one span per line, indented by nesting level.
fn print_spans(spans: &[Span]) {
    if spans.is_empty() {
        println!("No trace found.");
        return;
    }

    for span in spans {
        let indent = "  ".repeat(span.level as usize);
        let status = span
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let duration = span
            .duration
            .map(|d| format!("{}", d))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{}{} [{}] status={} duration={} logs={}{}",
            indent,
            span.name,
            span.date.to_rfc3339(),
            status,
            duration,
            span.logs.len(),
            if span.error { " ERROR" } else { "" },
        );
    }
}
