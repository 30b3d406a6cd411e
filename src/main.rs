use ear_trainer::config::{Config, DEFAULT_INIT_PASSWORD};
use ear_trainer::db::{self, TrainerStorage};
use ear_trainer::router::{SessionSettings, TrainerState, trainer_router};
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database.url,
        listen = %cfg.listen_addr(),
        loglevel = %cfg.basic.loglevel,
        insecure_cookie = cfg.basic.insecure_cookie
    );

    let pool = db::connect(&cfg.database.url, cfg.database.max_connections).await?;
    let storage = TrainerStorage::new(pool);
    let secret = db::initialize(&storage, &cfg.webserver.init_password).await?;

    if cfg.webserver.init_password == DEFAULT_INIT_PASSWORD {
        warn!("webserver.init_password is the built-in default; change the admin password");
    }

    // the secret is installed before the listener accepts anything
    let settings = SessionSettings::from_config(&cfg.webserver, cfg.basic.insecure_cookie)?;
    let state = TrainerState::new(storage, &secret, settings);
    let app = trainer_router(state);

    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(addr.as_str()).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
