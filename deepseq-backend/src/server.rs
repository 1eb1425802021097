use std::{pin::Pin, sync::Arc};

use anyhow::Context;
use axum::{Router, routing::get};
use camino::Utf8PathBuf;
use diesel::{ConnectionError, ConnectionResult, SqliteConnection, connection::SimpleConnection};
use diesel_async::{
    AsyncConnection, SimpleAsyncConnection,
    pooled_connection::{
        AsyncDieselConnectionManager, ManagerConfig,
        deadpool::{Object, Pool},
    },
    scoped_futures::ScopedFutureExt,
};
use diesel_migrations::MigrationHarness;
use tokio::{net::TcpListener, signal};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    config::Config,
    db::{self, DbConnection, MIGRATIONS},
};

mod api;
pub mod auth;

const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

/// # Errors
/// Fails if the database can't be migrated or seeded, or if the configured address can't be
/// bound.
pub async fn serve(config: Config, log_dir: Option<Utf8PathBuf>) -> anyhow::Result<()> {
    initialize_logging(log_dir);

    let app_addr = config.app_address();

    let app_state = AppState::initialize(config)
        .await
        .context("failed to initialize app state")?;
    tracing::info!("initialized app state");

    let app = app(app_state);

    let listener = TcpListener::bind(&app_addr)
        .await
        .context(format!("failed to listen on {app_addr}"))?;
    tracing::info!("deepseq listening on {app_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("failed to serve app")?;

    Ok(())
}

fn initialize_logging(log_dir: Option<Utf8PathBuf>) {
    use tracing::Level;
    use tracing_subscriber::{filter::Targets, prelude::*};

    let log_layer = tracing_subscriber::fmt::layer();

    match log_dir {
        None => {
            let dev_log_filter = Targets::new()
                .with_target("deepseq_backend", Level::DEBUG)
                .with_target("tower_http", Level::TRACE);
            let log_layer = log_layer.pretty().with_filter(dev_log_filter);

            tracing_subscriber::registry().with(log_layer).init();
        }
        Some(path) => {
            let log_writer = tracing_appender::rolling::daily(path, "deepseq.log");
            let prod_log_filter = Targets::new().with_target("deepseq_backend", Level::INFO);
            let log_layer = log_layer
                .json()
                .with_writer(log_writer)
                .with_filter(prod_log_filter);

            tracing_subscriber::registry().with(log_layer).init();
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    db_pool: Pool<DbConnection>,
    config: Arc<Config>,
}

impl AppState {
    /// Migrates the database, builds the connection pool and writes the configured seed data.
    ///
    /// # Errors
    /// Fails if any of those steps fails.
    pub async fn initialize(config: Config) -> anyhow::Result<Self> {
        run_migrations(config.db_url())
            .await
            .context("failed to run database migrations")?;
        tracing::info!("ran database migrations");

        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup = Box::new(establish_connection);

        let manager = AsyncDieselConnectionManager::<DbConnection>::new_with_config(
            config.db_url(),
            manager_config,
        );
        let db_pool = Pool::builder(manager)
            .max_size(config.db_max_connections())
            .build()?;

        let app_state = Self {
            db_pool,
            config: Arc::new(config),
        };

        app_state
            .write_seed_data()
            .await
            .context("failed to insert seed data")?;

        Ok(app_state)
    }

    /// # Errors
    /// Fails when no connection can be taken from the pool.
    pub async fn db_conn(&self) -> db::error::Result<Object<DbConnection>> {
        Ok(self.db_pool.get().await?)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn write_seed_data(&self) -> anyhow::Result<()> {
        let Some(seed_data) = self.config.seed_data()? else {
            tracing::info!("no seed data configured");
            return Ok(());
        };

        let mut db_conn = self.db_conn().await?;

        db_conn
            .transaction(|conn| async move { seed_data.write(conn).await }.scope_boxed())
            .await?;
        tracing::info!("inserted seed data");

        Ok(())
    }
}

// SQLite only enforces foreign keys when asked to, per connection
fn establish_connection(
    url: &str,
) -> Pin<Box<dyn Future<Output = ConnectionResult<DbConnection>> + Send + '_>> {
    Box::pin(async move {
        let mut db_conn = DbConnection::establish(url).await?;

        db_conn
            .batch_execute(CONNECTION_PRAGMAS)
            .await
            .map_err(ConnectionError::CouldntSetupConfiguration)?;

        Ok(db_conn)
    })
}

async fn run_migrations(db_url: &str) -> anyhow::Result<()> {
    let db_url = db_url.to_string();

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let mut db_conn = <SqliteConnection as diesel::Connection>::establish(&db_url)?;
        db_conn.batch_execute(CONNECTION_PRAGMAS)?;

        db_conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow::anyhow!(err))?;

        Ok(())
    })
    .await?
}

/// The full application: API routes, the health check and the uploaded files.
pub fn app(app_state: AppState) -> Router {
    let media_url = app_state.config().media_url();
    let media_url = media_url.trim_end_matches('/');
    let media_files = ServeDir::new(app_state.config().media_root());

    let router = api::router(app_state.config().max_upload_bytes())
        .route("/health", get(async || ()));

    let router = if media_url.is_empty() {
        router.fallback_service(media_files)
    } else {
        router.nest_service(media_url, media_files)
    };

    router
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
