use chrono::Utc;
use pipeline_backend::{
    config::{get_config, init_config, Config, LogFormat},
    database::{
        memory_store::MemoryStore,
        pg_store::PgStore,
        pool::{create_pool, run_migrations},
        store::Store,
    },
    routes, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config()?;
    init_tracing(config);

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            info!("Connected to PostgreSQL, migrations applied");
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set, using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::new(store, Arc::new(config.clone()));

    if let Some(bootstrap) = &config.bootstrap_admin {
        app_state
            .account_service
            .ensure_bootstrap_admin(bootstrap)
            .await?;
    }

    {
        let watcher = app_state.timeline_watcher();
        let interval = Duration::from_secs(config.timeline_sweep_secs.max(1));
        tokio::spawn(async move {
            loop {
                if let Err(e) = watcher.run_once(Utc::now()).await {
                    tracing::error!(error = ?e, "Timeline watcher error");
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    let app = routes::build_router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
