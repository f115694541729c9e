use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loqa_live::session::SUPPORTED_LANGUAGES;
use loqa_live::{create_router, AppState, CallController, CallState, Config, NatsConnector, WavDevices};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "loqa-live", about = "Live voice calls with a generative speech agent")]
struct Cli {
    /// Config file (without extension)
    #[arg(long, default_value = "config/loqa-live")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control API
    Serve {
        /// WAV file used as the microphone for every call
        #[arg(long)]
        input: PathBuf,
        /// Where to render the agent's speech
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Place a single call and print the transcript
    Call {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Language code (defaults to the configured language)
        #[arg(long)]
        language: Option<String>,
        /// Hang up after this many seconds
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
    /// List supported conversational languages
    Languages,
}

fn load_config(path: &str) -> Config {
    match Config::load(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Using default config ({:#})", e);
            Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Languages => {
            for lang in SUPPORTED_LANGUAGES {
                println!("{:<4} {:<10} {}", lang.code, lang.name, lang.native_name);
            }
            Ok(())
        }
        Command::Serve { input, output } => {
            let cfg = load_config(&cli.config);
            info!("Loqa Live v0.1.0 ({})", cfg.service.name);

            let connector = NatsConnector::connect(&cfg.live.nats_url).await?;
            let devices = WavDevices::new(input, output);
            let call = CallController::new(&cfg, Arc::new(connector), Arc::new(devices));

            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            info!("HTTP server listening on {}", addr);
            axum::serve(listener, create_router(AppState::new(call))).await?;
            Ok(())
        }
        Command::Call {
            input,
            output,
            language,
            seconds,
        } => {
            let cfg = load_config(&cli.config);

            let connector = NatsConnector::connect(&cfg.live.nats_url).await?;
            let devices = WavDevices::new(input, output);
            let call = CallController::new(&cfg, Arc::new(connector), Arc::new(devices));

            let mut state = call.subscribe_state();
            call.start(language.as_deref()).await?;

            // Run until the remote side ends the call or the time limit passes
            let ended = tokio::time::timeout(Duration::from_secs(seconds), async {
                while state.changed().await.is_ok() {
                    if *state.borrow() == CallState::Idle {
                        break;
                    }
                }
            })
            .await;

            if ended.is_err() {
                info!("Time limit reached; hanging up");
            }
            call.hangup().await?;

            let stats = call.stats().await;
            info!(
                "Call finished: {} chunks sent, {} units played",
                stats.chunks_sent, stats.units_scheduled
            );

            for entry in call.history().await {
                println!("[{:?}] {}", entry.role, entry.text);
            }
            Ok(())
        }
    }
}
