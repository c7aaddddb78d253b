//! Super-admin provisioning. The HTTP API refuses to create this role, so
//! the command line is the only way in.

use siges_core::hash_password;
use siges_models::{Email, Role, UserId};
use sqlx::PgPool;

pub async fn create_super_admin(
    db: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<UserId, Box<dyn std::error::Error>> {
    let email = Email::new(email)?;

    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }

    let hashed_password =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let user_id = sqlx::query_scalar::<_, UserId>(
        "INSERT INTO users (first_name, last_name, email, password, role, school_id)
         VALUES ($1, $2, $3, $4, $5, NULL)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(&email)
    .bind(&hashed_password)
    .bind(Role::SuperAdmin)
    .fetch_optional(db)
    .await?;

    user_id.ok_or_else(|| format!("User with email {} already exists", email).into())
}
