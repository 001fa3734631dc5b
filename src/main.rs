//! pollplan - group poll and workplan bot
//!
//! Collects poll and activity details through short chat conversations,
//! posts polls with vote buttons and lists workplan activities by month.

mod calendar;
mod callback;
mod config;
mod db;
mod handlers;
mod ledger;
mod render;
mod runtime;
mod session;
mod state_machine;
mod telegram;

use config::AppConfig;
use db::Database;
use runtime::{App, DatabaseStorage, Settings};
use session::MemorySessionStore;
use std::sync::Arc;
use teloxide::Bot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollplan=info,teloxide=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::load()?;

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Initialize database
    tracing::info!(path = %config.database_path.display(), "Opening database");
    let db = Database::open(&config.database_path)?;
    tracing::info!(schema_version = db.schema_version()?, "Database ready");

    let bot = Bot::new(config.telegram_token.clone());
    let app = App::new(
        telegram::TelegramTransport::new(bot.clone()),
        DatabaseStorage::new(db),
        Arc::new(MemorySessionStore::new()),
        Settings {
            bot_name: config.bot_name.clone(),
            timezone: config.timezone(),
        },
    );

    telegram::run(bot, Arc::new(app)).await;

    Ok(())
}
