//! TunePilot Telegram bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx cargo run -p tunepilot-telegram
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tunepilot_telegram::TunePilotBot;

/// TunePilot - download music from chat
#[derive(Parser, Debug)]
#[command(name = "tunepilot")]
#[command(about = "Telegram bot for downloading music from streaming providers")]
struct Args {
    /// Data directory (default: platform data dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tunepilot")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let _ = dotenvy::dotenv();

    let filter = match args.verbose {
        0 => "tunepilot=info,teloxide=warn",
        1 => "tunepilot=debug,teloxide=info",
        2 => "tunepilot=trace,teloxide=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let bot = TunePilotBot::new(&data_dir)?;

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "bot initialized");
            println!("TunePilot bot: @{}", username);
            println!("Open Telegram and send /start to begin. Press Ctrl+C to stop.");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to reach Telegram");
            return Err(e.into());
        }
    }

    bot.start_polling().await?;
    Ok(())
}
