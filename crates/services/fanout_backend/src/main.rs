// File: services/fanout_backend/src/main.rs
use axum::{routing::get, Router};
use fanout_common::logging;
use fanout_config::{load_config, AppConfig};
use fanout_firebase::{routes as push_routes, FirebaseServiceFactory, PushService};
use http::{header, HeaderValue, Method};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

mod health;

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors
        .origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Periodically remove inactive and stale registrations.
fn spawn_cleanup(service: Arc<PushService>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = service.cleanup().await;
            info!(
                "Scheduled cleanup removed {} registrations, {} remain",
                removed,
                service.len().await
            );
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(load_config()?);
    let _log_guard = logging::init_from_config(&config.logging);

    let service = Arc::new(
        FirebaseServiceFactory::new(config.clone())
            .push_service()
            .await,
    );
    if service.is_simulated() {
        warn!("No usable Firebase credentials, deliveries are simulated");
    }

    match config.registry.cleanup_interval_secs {
        Some(secs) if secs > 0 => spawn_cleanup(service.clone(), Duration::from_secs(secs)),
        _ => info!("Scheduled cleanup disabled"),
    }

    let api_router = Router::new()
        .route("/", get(health::health_handler))
        .with_state(service.clone())
        .merge(push_routes(config.clone(), service.clone()));

    let mut app = Router::new().nest("/api", api_router);

    // Conditionally add Swagger UI and JSON endpoint if openapi feature enabled
    #[cfg(feature = "openapi")]
    {
        use fanout_firebase::openapi::PushApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "Fanout API",
                version = "0.1.0",
                description = "Push notification fan-out service",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
            components(),
            tags( (name = "Fanout", description = "Core service endpoints")),
            servers( (url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(PushApiDoc::openapi());
        info!("Adding Swagger UI at /api/docs");

        let swagger_ui = SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc);
        app = app.merge(swagger_ui);
    }

    // Serve static files in dev mode
    if cfg!(debug_assertions) {
        info!("Running in development mode, serving static files from ../../dist");
        let static_router = Router::new().nest_service("/static", ServeDir::new("../../dist"));
        app = app.merge(static_router);
        app = app.fallback_service(ServeDir::new("../../dist"));
    }

    let app = app
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
