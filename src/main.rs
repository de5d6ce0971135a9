use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use snipbox::store::{MemoryBackend, MemorySessionStore, MemorySnippetStore, MemoryUserStore};
use snipbox::{routes, App, Config, Server, Service, SessionManager, TemplateCache};

/// How often expired sessions are swept from the in-memory store.
const SESSION_SWEEP: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; a malformed one is not.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("loading .env");
        }
    }
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let templates = TemplateCache::new(&config.templates)
        .with_context(|| format!("building template cache from {}", config.templates.display()))?;

    let sessions = MemorySessionStore::new();
    let sweeper = sessions.spawn_cleanup(SESSION_SWEEP);

    let app = App::<MemoryBackend>::new(
        MemorySnippetStore::new(),
        MemoryUserStore::new(),
        SessionManager::new(sessions, config.session()),
        templates,
    )
    .with_csrf(config.csrf())
    .with_debug(config.debug);

    Server::bind(config.addr)
        .serve(Service::new(app, routes()))
        .await?;

    sweeper.abort();
    Ok(())
}
