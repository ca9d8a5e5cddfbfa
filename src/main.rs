use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use visit_manager_server::auth::{AuthService, GoogleTokenInfoClient};
use visit_manager_server::config::Config;
use visit_manager_server::db;
use visit_manager_server::events::{
    EventPublisher, KafkaEventBus, NoopEventPublisher, ScheduledVisitListener,
};
use visit_manager_server::payments::{PaymentService, StripeProcessor};
use visit_manager_server::routes;
use visit_manager_server::state::AppState;
use visit_manager_server::users::UserService;
use visit_manager_server::visits::VisitService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting visit manager server...");

    let pool = db::create_pool(&config).await?;
    db::init_schema(&pool).await?;

    let events: Arc<dyn EventPublisher> = if config.kafka.is_configured() {
        match KafkaEventBus::new(&config.kafka) {
            Ok(bus) => {
                tracing::info!(
                    bootstrap = %config.kafka.bootstrap_url,
                    "Connected event publisher to message bus"
                );
                Arc::new(bus)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Message bus unavailable; events will be dropped");
                Arc::new(NoopEventPublisher)
            }
        }
    } else {
        tracing::warn!("KAFKA_BOOTSTRAP_URL not set; events will be dropped");
        Arc::new(NoopEventPublisher)
    };

    if config.stripe_api_key.is_empty() {
        tracing::warn!("STRIPE_API_KEY not set; charges will be rejected by the processor");
    }

    let user_service = Arc::new(UserService::new(pool.clone(), events.clone()));
    let visit_service = Arc::new(VisitService::new(pool.clone(), events.clone()));
    let payment_service = Arc::new(PaymentService::new(
        pool.clone(),
        Arc::new(StripeProcessor::new(config.stripe_api_key.clone())),
    ));
    let auth_service = Arc::new(AuthService::new(
        &config,
        user_service.clone(),
        Arc::new(GoogleTokenInfoClient::new(config.google_client_id.clone())),
    ));

    if config.kafka.is_configured() {
        match ScheduledVisitListener::new(&config.kafka, visit_service.clone()) {
            Ok(listener) => {
                tokio::spawn(listener.run());
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to start scheduled-visit listener");
            }
        }
    }

    let state = AppState {
        pool,
        auth_service,
        user_service,
        visit_service,
        payment_service,
    };

    let app = routes::app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}
