use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use feedback_guard::classifier::{create_classifier, download};
use feedback_guard::config::Config;
use feedback_guard::{moderation, output, web};

/// feedback-guard: flags offensive user feedback.
///
/// Serves POST /check-feedback, which runs submitted text through a toxicity
/// classifier and answers `{ "offensive": true|false }`.
#[derive(Parser)]
#[command(name = "feedback-guard", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (the default when no command is given)
    Serve,

    /// Classify a single text and print its label scores and verdict
    Check {
        /// The text to check
        text: String,
    },

    /// Download the ONNX toxicity model (~126 MB)
    DownloadModel,

    /// Show effective configuration and whether the model is available
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("feedback_guard=info,tower_http=info")
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            // Load the model before binding: no classifier, no server.
            let classifier = create_classifier(&config)?;
            info!(
                backend = classifier.name(),
                timeout_secs = config.classify_timeout.as_secs(),
                "Classifier ready"
            );
            web::run_server(&config, classifier).await?;
        }

        Commands::Check { text } => {
            let classifier = create_classifier(&config)?;
            let verdict =
                moderation::check(classifier.as_ref(), &text, config.classify_timeout).await?;
            output::terminal::display_verdict(&text, &verdict);
        }

        Commands::DownloadModel => {
            println!("Downloading ONNX toxicity model...");
            println!("  Destination: {}", config.model_dir.display());

            download::download_model(&config.model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("You can now run `feedback-guard serve`.");
        }

        Commands::Status => {
            output::terminal::display_status(&config);
        }
    }

    Ok(())
}
