mod app;
mod config;
mod handlers;
mod routes;
mod store;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use snippetbox_web::Server;
use snippetbox_web::session::{MemoryStore, SessionManager};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::Application;
use crate::config::Config;
use crate::store::MemorySnippetStore;

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app = Application::new(Arc::new(MemorySnippetStore::new()), config.static_dir.clone())
        .context("failed to build templates")?;

    let session_store = MemoryStore::with_cleanup_interval(SESSION_CLEANUP_INTERVAL);
    let sessions = SessionManager::new(Arc::new(session_store), config.session_config());

    let pipeline = routes::routes(Arc::new(app), Arc::new(sessions)).context("failed to build routes")?;

    let server = Server::builder()
        .address(config.addr.as_str())
        .pipeline(pipeline)
        .max_body_size(config.max_body_bytes)
        .drain_timeout(config.drain_timeout())
        .build()?;

    info!(addr = %config.addr, static_dir = %config.static_dir.display(), "starting server");
    server.start().await?;
    info!("server stopped");

    Ok(())
}
