use anyhow::anyhow;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info, instrument, warn};

use siges_auth::{Action, EntityKind, Principal, Scope, reachable};
use siges_core::{AppError, hash_password};
use siges_models::{Email, SchoolId, UserId};

use crate::modules::users::model::{CreateUserDto, RegisterUserDto, Role, UpdateUserDto, User};
use crate::utils::auth_helpers::ensure_within;
use crate::utils::db_errors::is_unique_violation;
use crate::utils::scope_sql::push_scope_predicate;

const USER_COLUMNS: &str =
    "u.id, u.email, u.first_name, u.last_name, u.role, u.school_id, u.date_joined, u.last_login";

const EMAIL_TAKEN: &str = "user with this email already exists.";

pub struct UserService;

impl UserService {
    /// Open self-registration. The role defaults to `parent` and may not be
    /// `super_admin`.
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "users"))]
    pub async fn register_user(db: &PgPool, dto: RegisterUserDto) -> Result<User, AppError> {
        if dto.password != dto.password2 {
            return Err(AppError::field("password", "Password fields didn't match."));
        }

        let role = dto.role.unwrap_or_default();
        if role == Role::SuperAdmin {
            warn!("Rejected self-registration as super-admin");
            return Err(AppError::field("role", "This role cannot be self-assigned."));
        }

        let email = Email::new(dto.email)
            .map_err(|_| AppError::field("email", "Enter a valid email address."))?;

        let user = insert_user(
            db,
            NewAccount {
                email,
                password: &dto.password,
                first_name: &dto.first_name,
                last_name: &dto.last_name,
                role,
                school: None,
            },
        )
        .await?;

        info!(user.id = %user.id, user.role = %user.role, "User registered");

        Ok(user)
    }

    /// Account creation by a super-admin: any role, optionally attached to
    /// an existing school.
    #[instrument(skip(db, dto), fields(user.role = %dto.role, db.operation = "INSERT", db.table = "users"))]
    pub async fn create_user(db: &PgPool, dto: CreateUserDto) -> Result<User, AppError> {
        let email = Email::new(dto.email)
            .map_err(|_| AppError::field("email", "Enter a valid email address."))?;

        let user = insert_user(
            db,
            NewAccount {
                email,
                password: &dto.password,
                first_name: &dto.first_name,
                last_name: &dto.last_name,
                role: dto.role,
                school: dto.school,
            },
        )
        .await?;

        info!(user.id = %user.id, user.role = %user.role, user.school = ?user.school, "User created");

        Ok(user)
    }

    /// The caller's own profile, whatever their scope.
    #[instrument(skip(db), fields(user.id = %user_id, db.operation = "SELECT", db.table = "users"))]
    pub async fn get_profile(db: &PgPool, user_id: UserId) -> Result<User, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    #[instrument(skip(db, principal), fields(user.id = %principal.id, db.operation = "SELECT", db.table = "users"))]
    pub async fn list_users(db: &PgPool, principal: &Principal) -> Result<Vec<User>, AppError> {
        let scope = reachable(principal, EntityKind::User);

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE "));
        push_scope_predicate(&mut qb, &scope, EntityKind::User);
        qb.push(" ORDER BY u.email, u.id");

        let users = qb.build_query_as::<User>().fetch_all(db).await?;

        debug!(count = users.len(), "Fetched users");

        Ok(users)
    }

    #[instrument(skip(db, principal), fields(account.id = %user_id, db.operation = "SELECT", db.table = "users"))]
    pub async fn get_user(
        db: &PgPool,
        principal: &Principal,
        user_id: UserId,
    ) -> Result<User, AppError> {
        let scope = reachable(principal, EntityKind::User);
        let mut qb = scoped_user_query(&scope, user_id);
        qb.build_query_as::<User>()
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    /// Changes names, role or school membership. Moving an account off the
    /// `director` role also detaches it from every school it directed.
    #[instrument(skip(db, principal, dto), fields(account.id = %user_id, user.id = %principal.id, db.operation = "UPDATE", db.table = "users"))]
    pub async fn update_user(
        db: &PgPool,
        principal: &Principal,
        user_id: UserId,
        action: Action,
        dto: UpdateUserDto,
    ) -> Result<User, AppError> {
        let mut tx = db.begin().await?;

        let current = lock_user(&mut tx, principal, user_id).await?;
        ensure_within(principal, action, EntityKind::User, current.school)?;

        if let Some(Some(school_id)) = dto.school {
            check_school(&mut tx, school_id).await?;
        }

        let role = dto.role.unwrap_or(current.role);

        let query = format!(
            "UPDATE users AS u
             SET first_name = $1, last_name = $2, role = $3, school_id = $4, updated_at = NOW()
             WHERE u.id = $5
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(dto.first_name.unwrap_or(current.first_name))
            .bind(dto.last_name.unwrap_or(current.last_name))
            .bind(role)
            .bind(dto.school.unwrap_or(current.school))
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        if current.role == Role::Director && role != Role::Director {
            let detached = sqlx::query(
                "UPDATE schools SET director_id = NULL, updated_at = NOW() WHERE director_id = $1",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            info!(account.id = %user_id, schools = detached, "Former director detached from schools");
        }

        tx.commit().await?;

        info!(account.id = %user.id, user.role = %user.role, "User updated");

        Ok(user)
    }

    #[instrument(skip(db, principal), fields(account.id = %user_id, user.id = %principal.id, db.operation = "DELETE", db.table = "users"))]
    pub async fn delete_user(
        db: &PgPool,
        principal: &Principal,
        user_id: UserId,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let current = lock_user(&mut tx, principal, user_id).await?;
        ensure_within(principal, Action::Destroy, EntityKind::User, current.school)?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(account.id = %user_id, "User deleted");

        Ok(())
    }
}

fn scoped_user_query(scope: &Scope, user_id: UserId) -> QueryBuilder<'static, Postgres> {
    let mut qb =
        QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = "));
    qb.push_bind(user_id).push(" AND ");
    push_scope_predicate(&mut qb, scope, EntityKind::User);
    qb
}

async fn lock_user(
    tx: &mut Transaction<'_, Postgres>,
    principal: &Principal,
    user_id: UserId,
) -> Result<User, AppError> {
    let scope = reachable(principal, EntityKind::User);
    let mut qb = scoped_user_query(&scope, user_id);
    qb.push(" FOR UPDATE");
    qb.build_query_as::<User>()
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
}

struct NewAccount<'a> {
    email: Email,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    role: Role,
    school: Option<SchoolId>,
}

async fn insert_user(db: &PgPool, account: NewAccount<'_>) -> Result<User, AppError> {
    let mut tx = db.begin().await?;

    let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(&account.email)
        .fetch_one(&mut *tx)
        .await?;
    if taken {
        return Err(AppError::field("email", EMAIL_TAKEN));
    }

    if let Some(school_id) = account.school {
        check_school(&mut tx, school_id).await?;
    }

    let password_hash = hash_password(account.password)?;

    let query = format!(
        "INSERT INTO users AS u (email, password, first_name, last_name, role, school_id)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&query)
        .bind(&account.email)
        .bind(&password_hash)
        .bind(account.first_name)
        .bind(account.last_name)
        .bind(account.role)
        .bind(account.school)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::field("email", EMAIL_TAKEN);
            }
            AppError::from(e)
        })?;

    tx.commit().await?;

    Ok(user)
}

async fn check_school(
    tx: &mut Transaction<'_, Postgres>,
    school_id: SchoolId,
) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM schools WHERE id = $1)")
        .bind(school_id)
        .fetch_one(&mut **tx)
        .await?;
    if !exists {
        return Err(AppError::field(
            "school",
            format!("Invalid pk \"{}\" - object does not exist.", school_id),
        ));
    }
    Ok(())
}
