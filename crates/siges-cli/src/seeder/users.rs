//! Account generation: one director per school plus its staff.

use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rayon::prelude::*;
use siges_models::{Role, SchoolId, UserId};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Instant;

use super::SEED_EMAIL_DOMAIN;
use super::models::{StaffPerSchool, UserSeed};

pub fn generate_directors(school_ids: &[SchoolId], password_hash: &str) -> Vec<UserSeed> {
    school_ids
        .par_iter()
        .enumerate()
        .map(|(school_idx, &school_id)| {
            generate_user(Role::Director, Some(school_id), school_idx, 0, password_hash)
        })
        .collect()
}

pub fn generate_staff_users(
    school_ids: &[SchoolId],
    staff: &StaffPerSchool,
    password_hash: &str,
) -> Vec<UserSeed> {
    let roles = [
        (Role::Admin, staff.admins),
        (Role::Teacher, staff.teachers),
        (Role::Accountant, staff.accountants),
    ];

    school_ids
        .par_iter()
        .enumerate()
        .flat_map(|(school_idx, &school_id)| {
            roles
                .iter()
                .flat_map(|&(role, count)| {
                    (0..count).map(move |user_idx| {
                        generate_user(role, Some(school_id), school_idx, user_idx, password_hash)
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub(crate) fn generate_user(
    role: Role,
    school_id: Option<SchoolId>,
    group_idx: usize,
    user_idx: usize,
    password_hash: &str,
) -> UserSeed {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();
    named_user(role, school_id, first_name, last_name, group_idx, user_idx, password_hash)
}

pub(crate) fn named_user(
    role: Role,
    school_id: Option<SchoolId>,
    first_name: String,
    last_name: String,
    group_idx: usize,
    user_idx: usize,
    password_hash: &str,
) -> UserSeed {
    let email = format!(
        "{}.{}+{}{}@{}",
        email_part(&first_name),
        email_part(&last_name),
        role.as_str().replace('_', ""),
        group_idx * 1000 + user_idx,
        SEED_EMAIL_DOMAIN
    );

    UserSeed {
        first_name,
        last_name,
        email,
        password_hash: password_hash.to_string(),
        role,
        school_id,
    }
}

fn email_part(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

pub async fn seed_directors(
    db: &PgPool,
    school_ids: &[SchoolId],
    password_hash: &str,
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🎩 Seeding {} directors...", school_ids.len());

    let users = generate_directors(school_ids, password_hash);
    let ids = insert_users_batch(db, &users).await?;

    println!(
        "   ✓ Inserted {} directors in {:?}",
        ids.len(),
        start_time.elapsed()
    );

    Ok(ids)
}

pub async fn seed_staff_users(
    db: &PgPool,
    school_ids: &[SchoolId],
    staff: &StaffPerSchool,
    password_hash: &str,
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!(
        "👥 Seeding staff ({} admins, {} teachers, {} accountants per school)...",
        staff.admins, staff.teachers, staff.accountants
    );

    let users = generate_staff_users(school_ids, staff, password_hash);
    let ids = insert_users_batch(db, &users).await?;

    println!(
        "   ✓ Inserted {} staff users in {:?}",
        ids.len(),
        start_time.elapsed()
    );

    Ok(ids)
}

pub async fn insert_users_batch(
    db: &PgPool,
    users: &[UserSeed],
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    // 6 params per user
    const BATCH_SIZE: usize = 1000;

    let mut tx = db.begin().await?;
    let mut all_ids = Vec::with_capacity(users.len());

    for chunk in users.chunks(BATCH_SIZE) {
        all_ids.extend(insert_users_chunk(&mut tx, chunk).await?);
    }

    tx.commit().await?;
    Ok(all_ids)
}

async fn insert_users_chunk(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO users (first_name, last_name, email, password, role, school_id) ",
    );
    qb.push_values(users, |mut row, user| {
        row.push_bind(&user.first_name)
            .push_bind(&user.last_name)
            .push_bind(&user.email)
            .push_bind(&user.password_hash)
            .push_bind(user.role)
            .push_bind(user.school_id);
    });
    qb.push(" RETURNING id");

    let ids = qb.build_query_scalar().fetch_all(&mut **tx).await?;
    Ok(ids)
}

/// Removes every generated account. Super-admins are never touched.
pub async fn clear_users(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded users...");

    let result = sqlx::query("DELETE FROM users WHERE email LIKE $1 AND role <> $2")
        .bind(format!("%@{}", SEED_EMAIL_DOMAIN))
        .bind(Role::SuperAdmin)
        .execute(db)
        .await?
        .rows_affected();

    println!(
        "   ✓ Deleted {} users in {:?}",
        result,
        start_time.elapsed()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_emails_are_lowercase_and_tagged_by_role() {
        let user = named_user(
            Role::SuperAdmin,
            None,
            "Anne-Marie".to_string(),
            "O'Neil".to_string(),
            2,
            7,
            "hash",
        );
        assert_eq!(user.email, "annemarie.oneil+superadmin2007@example.com");
    }

    #[test]
    fn staff_counts_per_school() {
        let schools = vec![SchoolId::new(), SchoolId::new()];
        let staff = StaffPerSchool {
            admins: 1,
            teachers: 3,
            accountants: 2,
        };
        let users = generate_staff_users(&schools, &staff, "hash");
        assert_eq!(users.len(), 12);
        assert_eq!(
            users.iter().filter(|u| u.role == Role::Teacher).count(),
            6
        );
        assert!(users.iter().all(|u| u.school_id.is_some()));
    }
}
