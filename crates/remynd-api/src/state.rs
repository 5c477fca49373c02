//! Application state wiring all capabilities together.
//!
//! AppState holds the concrete component instances used by both the CLI and
//! the webhook server. Core components are generic over the capability
//! traits, but AppState pins them to the concrete infra implementations --
//! constructed once at startup and passed by reference everywhere
//! (dependency injection, no ambient globals).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use remynd_core::router::CommandRouter;
use remynd_core::scheduler::ReminderScheduler;
use remynd_infra::config::{
    load_config, resolve_data_dir, secret_from_env, LLM_API_KEY_ENV, TWILIO_AUTH_TOKEN_ENV,
};
use remynd_infra::llm::{ChatClient, LlmExtractor, LlmRenderer};
use remynd_infra::notify::TwilioNotifier;
use remynd_infra::sqlite::pool::DatabasePool;
use remynd_infra::sqlite::reminder::SqliteReminderRepository;
use remynd_types::config::RemyndConfig;

/// Concrete type aliases for the component generics pinned to infra implementations.
pub type ConcreteRouter = CommandRouter<LlmExtractor, SqliteReminderRepository, TwilioNotifier>;

pub type ConcreteScheduler =
    ReminderScheduler<SqliteReminderRepository, TwilioNotifier, LlmRenderer>;

/// Shared application state holding all wired components.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ConcreteRouter>,
    pub scheduler: Arc<ConcreteScheduler>,
    pub store: Arc<SqliteReminderRepository>,
    pub config: RemyndConfig,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database, wire capabilities into the router and scheduler.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;

        // Initialize database
        let db_url = format!("sqlite://{}?mode=rwc", data_dir.join("remynd.db").display());
        let db_pool = DatabasePool::new(&db_url).await?;

        // Secrets come from the environment only
        let llm_api_key = secret_from_env(LLM_API_KEY_ENV)
            .with_context(|| format!("{LLM_API_KEY_ENV} is not set"))?;
        let twilio_auth_token = secret_from_env(TWILIO_AUTH_TOKEN_ENV)
            .with_context(|| format!("{TWILIO_AUTH_TOKEN_ENV} is not set"))?;

        // Text-understanding backend: one client per capability so the
        // extractor and renderer stay independently replaceable.
        let extractor = LlmExtractor::new(ChatClient::new(
            llm_api_key.clone(),
            config.llm.base_url.clone(),
            config.llm.model.clone(),
        ));
        let renderer = LlmRenderer::new(ChatClient::new(
            llm_api_key,
            config.llm.base_url.clone(),
            config.llm.model.clone(),
        ));

        // Outbound channel, one instance each for replies and deliveries
        let reply_notifier = TwilioNotifier::new(
            config.twilio.account_sid.clone(),
            twilio_auth_token.clone(),
            config.twilio.from_number.clone(),
        );
        let delivery_notifier = TwilioNotifier::new(
            config.twilio.account_sid.clone(),
            twilio_auth_token,
            config.twilio.from_number.clone(),
        );

        // The request path and the scheduler share only the store
        let router = CommandRouter::new(
            extractor,
            SqliteReminderRepository::new(db_pool.clone()),
            reply_notifier,
        );
        let scheduler = ReminderScheduler::new(
            SqliteReminderRepository::new(db_pool.clone()),
            delivery_notifier,
            renderer,
            Duration::from_secs(config.scheduler.poll_interval_secs),
        );

        Ok(Self {
            router: Arc::new(router),
            scheduler: Arc::new(scheduler),
            store: Arc::new(SqliteReminderRepository::new(db_pool)),
            config,
        })
    }
}
