use axum::Router;
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use onboardserver::catalog::configure_catalog_routes;
use onboardserver::clients::configure_client_routes;
use onboardserver::config::AppConfig;
use onboardserver::files::{configure_file_routes, init_drive};
use onboardserver::insights::configure_insight_routes;
use onboardserver::shared::state::AppState;
use onboardserver::shared::utils::{create_conn, run_migrations};
use onboardserver::team::configure_team_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env()?;

    let pool = create_conn()?;
    run_migrations(&pool).map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;

    let drive = match init_drive(&config.drive).await {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("drive unavailable, file uploads disabled: {}", e);
            None
        }
    };

    let bucket_name = config.drive.bucket.clone();
    let host = config.server.host.clone();
    let port = config.server.port;

    let app_state = Arc::new(AppState {
        drive,
        bucket_name,
        config,
        conn: pool,
        http: reqwest::Client::new(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(configure_client_routes())
        .merge(configure_catalog_routes())
        .merge(configure_team_routes())
        .merge(configure_file_routes())
        .merge(configure_insight_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    info!("Starting HTTP server on {}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
