use axum::{
    Server,
    http::HeaderValue,
    middleware::from_fn,
};
use feedback_backend::{
    AppState,
    config::Config,
    db::create_pool,
    init_tracing,
    middleware::{auth::AuthService, logger::logger},
    notifications::{LoggingNotifier, NotificationTemplates, Notifier, mattermost::MattermostNotifier},
    routes::create_router,
    store::{AssessmentStore, postgres::PgStore},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_tracing(&config.logging());

    let pool = create_pool(&config.database())?;
    let store: Arc<dyn AssessmentStore> = Arc::new(PgStore::new(pool));

    let notifier: Arc<dyn Notifier> = match MattermostNotifier::from_config(&config.notifier())? {
        Some(mattermost) => {
            info!("Delivering notifications through Mattermost");
            Arc::new(mattermost)
        }
        None => {
            warn!("Mattermost is not configured; notifications will only be logged");
            Arc::new(LoggingNotifier)
        }
    };

    let templates = NotificationTemplates::new(&config.frontend_url)?;
    let scheduler_config = config.scheduler();
    let state = Arc::new(AppState::new(
        store,
        notifier,
        templates,
        AuthService::new(&config.auth()),
        config.cascade_mode,
        &scheduler_config,
    ));

    if scheduler_config.enabled {
        state.scheduler.start();
    } else {
        info!("Reconciliation scheduler disabled");
    }

    let app = create_router(state.clone())
        .layer(cors_layer(&config.server().cors_origins))
        .layer(from_fn(logger));

    let addr: SocketAddr = config.server_address().parse()?;
    info!(%addr, cascade_mode = ?config.cascade_mode, "Server running");
    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.scheduler.stop().await;
    info!("Server stopped");
    Ok(())
}
