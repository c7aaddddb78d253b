use anyhow::Context;
use axum::{ServiceExt, extract::Request};
use dotenvy::dotenv;
use tracing::{error, info};

use siges::logging::init_tracing;
use siges::router::init_app;
use siges::state::init_app_state;
use siges_config::{DatabaseConfig, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let server = ServerConfig::from_env();
    let _guards = init_tracing(&server.log_dir).context("Failed to set up log files")?;

    let Some(database) = DatabaseConfig::from_env() else {
        error!("DATABASE_URL must be set");
        std::process::exit(1);
    };

    let state = init_app_state(&database)
        .await
        .context("Failed to connect to database")?;

    siges_db::run_migrations(&state.db)
        .await
        .context("Failed to run migrations")?;

    let app = init_app(state);

    let address = server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    info!(server.address = %address, "SIGES API listening");
    println!("🚀 Server running on http://{address}");
    println!("📚 Swagger UI available at http://{address}/swagger-ui");
    println!("📖 Scalar UI available at http://{address}/scalar");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;

    Ok(())
}
