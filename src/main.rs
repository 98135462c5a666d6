use std::{path::Path, sync::Arc};

use anyhow::Context;
use lets_read_sync::{
    config::{Config, StoreBackend},
    reader_api::ReaderApi,
    sessions::SessionRegistry,
    storage::{ProgressStore, ReadingCatalog, database::SeaOrmStore},
    supabase_client::SupabaseClient,
};
use migration::MigratorTrait;
use poem::{
    EndpointExt, Route, Server,
    listener::TcpListener,
    middleware::{Cors, Tracing as PoemTracing},
};
use poem_openapi::OpenApiService;
use sea_orm::Database;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder, prelude::*};

type ReadSyncResult<T> = anyhow::Result<T>;

#[tokio::main]
async fn main() -> ReadSyncResult<()> {
    // Respect RUST_LOG if set, default to info for our crate and warn for deps.
    let default_filter = format!(
        "{}=info,poem=info,reqwest=warn,sea_orm=warn,sqlx=warn",
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
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting Let's Read progress sync"
    );
    if Path::new(".env.local").exists() {
        dotenvy::from_filename(".env.local")?;
    } else if Path::new(".env").exists() {
        dotenvy::from_filename(".env")?;
    };
    let config = Config::load()?;
    config.validate()?;

    let (store, catalog) = connect_store(&config).await?;
    let registry = Arc::new(
        SessionRegistry::new(Arc::clone(&store), config.sync)
            .with_idle_ttl(config.session_idle_ttl),
    );
    registry.spawn_reaper();
    tracing::info!(
        backend = config.backend.as_str(),
        min_interval_ms = config.sync.min_interval.as_millis() as u64,
        min_change = config.sync.min_change,
        session_idle_ttl_secs = config.session_idle_ttl.as_secs(),
        "configured progress store"
    );

    let api = ReaderApi {
        registry,
        store,
        catalog,
        backend: config.backend.as_str(),
    };
    run_poem(api, &config.bind_addr).await
}

async fn connect_store(
    config: &Config,
) -> ReadSyncResult<(Arc<dyn ProgressStore>, Arc<dyn ReadingCatalog>)> {
    match config.backend {
        StoreBackend::Sqlite => {
            let db_conn = Database::connect(&config.db_connection_string)
                .await
                .with_context(|| "Failed to connect to database")?;
            migration::Migrator::up(&db_conn, None)
                .await
                .with_context(|| "Failed to run database migrations")?;
            let store = Arc::new(SeaOrmStore::new(Arc::new(db_conn)));
            let progress: Arc<dyn ProgressStore> = store.clone();
            let catalog: Arc<dyn ReadingCatalog> = store;
            Ok((progress, catalog))
        }
        StoreBackend::Supabase => {
            let mut client = SupabaseClient::new(&config.supabase_url, &config.supabase_anon_key)?;
            if let Some(token) = &config.supabase_access_token {
                client = client.with_access_token(token);
            }
            tracing::info!(
                supabase_url = %config.supabase_url,
                has_access_token = config.supabase_access_token.is_some(),
                "configured Supabase client"
            );
            let client = Arc::new(client);
            let progress: Arc<dyn ProgressStore> = client.clone();
            let catalog: Arc<dyn ReadingCatalog> = client;
            Ok((progress, catalog))
        }
    }
}

pub async fn run_poem(api: ReaderApi, bind_addr: &str) -> ReadSyncResult<()> {
    let version = env!("CARGO_PKG_VERSION");
    let api_service = OpenApiService::new(api, "Let's Read progress sync", version)
        .server(format!("http://{}", bind_addr));
    let ui = api_service.rapidoc();
    let spec = api_service.spec();
    let route = Route::new()
        .nest("/", api_service)
        .nest("/ui", ui)
        .nest("/spec", poem::endpoint::make_sync(move |_| spec.clone()))
        .with(Cors::new())
        .with(PoemTracing);

    tracing::info!(%bind_addr, "starting HTTP server");
    Server::new(TcpListener::bind(bind_addr)).run(route).await?;
    Ok(())
}
