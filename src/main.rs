mod config;
mod domain;
mod gate;
mod paystack_client;
mod reader_api;
mod storage;
#[cfg(test)]
mod testing;

use std::{path::Path, sync::Arc};

use anyhow::Context;
use config::Config;
use gate::AccessGate;
use migration::MigratorTrait;
use paystack_client::PaystackClient;
use poem::{
    EndpointExt, Route, Server,
    listener::TcpListener,
    middleware::{Cors, Tracing as PoemTracing},
};
use poem_openapi::OpenApiService;
use sea_orm::Database;
use storage::{SeaOrmCatalogStore, SeaOrmProgressStore, SeaOrmSessionStore};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder, prelude::*};

type BookGateResult<T> = anyhow::Result<T>;

#[tokio::main]
async fn main() -> BookGateResult<()> {
    // Respect RUST_LOG if set, default to info for our crate and warn for deps.
    let default_filter = format!(
        "{}=info,poem=info,sea_orm=warn,sqlx=warn,reqwest=warn,h2=warn",
        env!("CARGO_PKG_NAME")
    );
    let env_filter = std::env::var("RUST_LOG").unwrap_or(default_filter);
    SubscriberBuilder::default()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .with_level(true)
        .pretty()
        .finish()
        .with(ErrorLayer::default())
        .init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting bookgate");

    // Load environment variables from .env files
    if Path::new(".env.local").exists() {
        dotenvy::from_filename(".env.local")?;
    } else if Path::new(".env").exists() {
        dotenvy::from_filename(".env")?;
    };
    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let db_conn = Database::connect(&config.db_connection_string)
        .await
        .with_context(|| "Failed to connect to database")?;

    migration::Migrator::up(&db_conn, None)
        .await
        .with_context(|| "Failed to run database migrations")?;

    let paystack = PaystackClient::new(&config.paystack_base_url, config.gateway_timeout())?
        .with_secret_key(&config.paystack_secret_key);
    tracing::info!(
        paystack_base = %config.paystack_base_url,
        timeout_ms = config.gateway_timeout_ms,
        free_page_limit = config.free_page_limit(),
        "configured access gate"
    );

    run_poem(Arc::new(config), Arc::new(db_conn), Arc::new(paystack)).await?;
    Ok(())
}

pub async fn run_poem(
    config: Arc<Config>,
    db: Arc<sea_orm::DatabaseConnection>,
    paystack: Arc<PaystackClient>,
) -> BookGateResult<()> {
    let version = env!("CARGO_PKG_VERSION");
    let gate = AccessGate::new(
        Arc::new(SeaOrmProgressStore::new(db.clone())),
        Arc::new(SeaOrmCatalogStore::new(db.clone())),
        paystack,
        config.free_page_limit(),
        config.gateway_timeout(),
    );
    let api = reader_api::BookGateApi {
        gate: Arc::new(gate),
        authenticator: Arc::new(SeaOrmSessionStore::new(db.clone())),
        db,
    };
    let api_service = OpenApiService::new(api, "BookGate API", version)
        .server(format!("http://{}", config.bind_addr));
    let ui = api_service.rapidoc();
    let spec = api_service.spec();
    let route = Route::new()
        .nest("/", api_service)
        .nest("/ui", ui)
        .nest("/spec", poem::endpoint::make_sync(move |_| spec.clone()))
        .with(Cors::new())
        .with(PoemTracing);

    let bind_addr = config.bind_addr.as_str();
    tracing::info!(%bind_addr, "starting HTTP server");
    Server::new(TcpListener::bind(bind_addr)).run(route).await?;
    Ok(())
}
