use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use discollama::bot::discord;
use discollama::core::config::{AppPaths, ConfigService};
use discollama::core::logging;
use discollama::state::AppState;

/// Conversation id used by the local chat loop.
const LOCAL_CONVERSATION_ID: &str = "test_channel";

#[derive(Debug, Parser)]
#[command(author, version, about = "Discord support bot backed by Ollama and a local document index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Connect to Discord and answer support tickets (default)
    Run,
    /// Index every text file in a directory
    IngestDir {
        path: PathBuf,
    },
    /// Index a single web page
    IngestUrl {
        url: String,
    },
    /// Chat with the pipeline from the terminal; type `exit` to quit
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let command = cli.command.unwrap_or(Commands::Run);

    // the token is checked before anything is opened
    let token = match command {
        Commands::Run => match ConfigService::new(paths.clone()).discord_token() {
            Ok(token) => Some(token),
            Err(err) => {
                tracing::error!("{}", err);
                return Err(err.into());
            }
        },
        _ => None,
    };

    let state = AppState::initialize(paths).await?;

    let result = match command {
        Commands::Run => match token {
            Some(token) => discord::run(&token, state.support_desk())
                .await
                .context("Discord client stopped with an error"),
            None => Ok(()),
        },
        Commands::IngestDir { path } => state
            .pipeline
            .load_local_directory(&path)
            .await
            .map(|chunks| println!("Indexed {} chunks from {}", chunks, path.display()))
            .with_context(|| format!("Failed to index {}", path.display())),
        Commands::IngestUrl { url } => state
            .pipeline
            .load_url(&url)
            .await
            .map(|chunks| println!("Indexed {} chunks from {}", chunks, url))
            .with_context(|| format!("Failed to index {}", url)),
        Commands::Chat => chat_loop(&state).await,
    };

    state.shutdown().await;
    result
}

async fn chat_loop(state: &AppState) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") {
            break;
        }
        if message.is_empty() {
            continue;
        }

        match state.pipeline.chat(message, LOCAL_CONVERSATION_ID).await {
            Ok(reply) => println!("Bot: {}", reply),
            Err(err) => {
                tracing::error!("Chat failed: {}", err);
                println!("Bot: (error) {}", err);
            }
        }
    }
    Ok(())
}
