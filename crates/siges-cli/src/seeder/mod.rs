//! Database seeding with fake schools, levels, classes, staff, students and
//! their parents.
//!
//! - [`schools`] - schools and director assignment
//! - [`levels`] - levels and their classes
//! - [`users`] - directors and staff accounts
//! - [`students`] - students grouped into families with a parent account
//! - [`models`] - seed rows and sizing configuration
//!
//! Generation runs in parallel with Rayon; inserts use multi-row `VALUES`
//! statements in chunks. Every seeded account shares one password hashed
//! once at low bcrypt cost, and every seeded email ends in
//! `@example.com`, which is how [`clear_all`] tells them apart.

pub mod levels;
pub mod models;
pub mod schools;
pub mod students;
pub mod users;

pub use models::{LevelsPerSchool, SeedConfig, StaffPerSchool};

use bcrypt::hash;
use chrono::{Datelike, NaiveDate};
use siges_models::ClassId;
use sqlx::PgPool;
use std::time::Instant;

pub const SEED_PASSWORD: &str = "Password@123";
pub const SEED_EMAIL_DOMAIN: &str = "example.com";

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let levels_cfg = &config.levels_per_school;

    println!("🌱 Starting full database seeding...");
    println!("   - Schools: {}", config.num_schools);
    println!(
        "   - Levels per school: {}, classes per level: {}",
        levels_cfg.count, levels_cfg.classes_per_level
    );
    println!(
        "   - Accounts per school: {}, students per school: {}",
        config.accounts_per_school(),
        config.students_per_school()
    );

    let password_hash = hash_password()?;
    let academic_year = academic_year_of(chrono::Local::now().date_naive());

    let school_ids = schools::seed_schools(db, config.num_schools).await?;

    let director_ids = users::seed_directors(db, &school_ids, &password_hash).await?;
    schools::assign_directors(db, &school_ids, &director_ids).await?;

    users::seed_staff_users(db, &school_ids, &config.staff_per_school, &password_hash).await?;

    let level_ids = levels::seed_levels(db, &school_ids, levels_cfg.count).await?;
    let class_ids =
        levels::seed_classes(db, &level_ids, levels_cfg.classes_per_level, &academic_year).await?;

    let (student_count, parent_count) = students::seed_students(
        db,
        &class_ids,
        levels_cfg.students_per_class,
        levels_cfg.students_per_parent,
        &password_hash,
    )
    .await?;

    println!(
        "\n✅ Seeding complete! Created {} schools, {} levels, {} classes, {} students, {} parents in {:?}",
        school_ids.len(),
        level_ids.len(),
        class_ids.len(),
        student_count,
        parent_count,
        start_time.elapsed()
    );
    println!("\n📝 Default password for all seeded accounts: {}", SEED_PASSWORD);

    Ok(())
}

/// Seeds students (and their parents) into classes that already exist.
pub async fn seed_students_only(
    db: &PgPool,
    students_per_class: usize,
    students_per_parent: usize,
) -> Result<usize, Box<dyn std::error::Error>> {
    let class_ids: Vec<ClassId> = sqlx::query_scalar("SELECT id FROM classes ORDER BY level_id, name")
        .fetch_all(db)
        .await?;

    if class_ids.is_empty() {
        return Err("No classes found. Run `seed` first.".into());
    }

    let password_hash = hash_password()?;
    let (students, _) = students::seed_students(
        db,
        &class_ids,
        students_per_class,
        students_per_parent,
        &password_hash,
    )
    .await?;

    Ok(students)
}

/// Clears every seeded row. Super-admins and accounts outside
/// `@example.com` are kept.
pub async fn clear_all(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing all seeded data...");

    // students block class deletion, so they go first
    students::clear_students(db).await?;
    schools::clear_schools(db).await?;
    users::clear_users(db).await?;

    println!("✅ All seeded data cleared in {:?}", start_time.elapsed());
    Ok(())
}

fn hash_password() -> Result<String, Box<dyn std::error::Error>> {
    println!("🔐 Hashing password...");
    let start = Instant::now();
    // cost 4 for seeded accounts only
    let hash = hash(SEED_PASSWORD, 4).map_err(|e| format!("Failed to hash password: {}", e))?;
    println!("   ✓ Hashed password in {:?}", start.elapsed());
    Ok(hash)
}

/// School years start in September: `2024-2025` runs from September 2024 to
/// August 2025.
pub fn academic_year_of(date: NaiveDate) -> String {
    let start = if date.month() >= 9 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}-{}", start, start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn academic_year_turns_over_in_september() {
        let august = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();
        let september = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(academic_year_of(august), "2024-2025");
        assert_eq!(academic_year_of(september), "2025-2026");
    }
}
