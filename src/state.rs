use siges_config::{AllowedOrigins, DatabaseConfig, JwtConfig, ServerConfig};
use siges_db::init_db_pool;
use sqlx::PgPool;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub allowed_origins: AllowedOrigins,
}

impl AppState {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            jwt_config: JwtConfig::from_env(),
            allowed_origins: ServerConfig::from_env().allowed_origins,
        }
    }
}

pub async fn init_app_state(database: &DatabaseConfig) -> Result<AppState, sqlx::Error> {
    let db = init_db_pool(database).await?;
    Ok(AppState::new(db))
}
