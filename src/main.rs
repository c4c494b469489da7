//! Social Rating Bot - Entry Point
//!
//! Options:
//! - --json-logs: JSON logs on stderr instead of colored stdout
//! - --help / -h: usage

use social_rating_bot::Config;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let json_logs = args.iter().any(|a| a == "--json-logs");
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");

    if help_mode {
        println!("Social Rating Bot v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: social-rating-bot [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --json-logs        Log JSON to stderr");
        println!("  --help, -h         Show this help");
        println!();
        println!("Environment variables:");
        println!("  TELOXIDE_TOKEN           Telegram bot token (or TELEGRAM_BOT_TOKEN)");
        println!("  RATING_DATA_PATH         Rating JSON file");
        println!("  MODERATION_API_URL       Chat-completions endpoint");
        println!("  MODERATION_TIMEOUT_SECS  Per-call timeout (default: 15)");
        println!("  MODERATION_MAX_RETRIES   Attempts per message (default: 2)");
        println!("  CLEANUP_DELAY_MS         Reply lifetime (default: 2000)");
        println!("  AUTHOR_CACHE_CAPACITY    Messages kept for reactions (default: 5000)");
        println!("  SUBJECT_USERNAME         Moderated user (default: danilalox)");
        println!("  SUBJECT_DISPLAY_NAME     Name in replies (default: Данилы)");
        println!("  BLOCKED_USERNAME         Ignored user (default: chemiakin)");
        println!("  RESET_ADMIN_USERNAME     Who may /clear (default: purpletooth)");
        println!("  ROAST_USER_ID            Roasted user id (default: 5301118406)");
        println!();
        println!("Set a username variable to an empty string to disable it.");
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    if json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Social Rating Bot v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    social_rating_bot::telegram::run_bot(config).await?;

    Ok(())
}
