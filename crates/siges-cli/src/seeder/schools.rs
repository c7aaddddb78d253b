//! School generation, insertion and director assignment.

use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, StreetName};
use fake::faker::phone_number::en::PhoneNumber;
use rayon::prelude::*;
use siges_models::{SchoolId, UserId};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Instant;

use super::models::SchoolSeed;

const SCHOOL_KINDS: [&str; 5] = [
    "Groupe Scolaire",
    "Complexe Scolaire",
    "Collège",
    "Lycée",
    "École",
];

pub fn generate_schools(count: usize) -> Vec<SchoolSeed> {
    (0..count)
        .into_par_iter()
        .map(|i| {
            let city: String = CityName().fake();
            let street: String = StreetName().fake();
            let building: String = BuildingNumber().fake();
            let phone: String = PhoneNumber().fake();

            SchoolSeed {
                name: format!("{} {} {}", SCHOOL_KINDS[i % SCHOOL_KINDS.len()], city, i + 1),
                address: format!("{} {}, {}", building, street, city),
                contact_info: phone,
            }
        })
        .collect()
}

pub async fn seed_schools(
    db: &PgPool,
    count: usize,
) -> Result<Vec<SchoolId>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🏫 Seeding {} schools...", count);

    let schools = generate_schools(count);
    let school_ids = insert_schools_batch(db, &schools).await?;

    println!(
        "   ✓ Inserted {} schools in {:?}",
        school_ids.len(),
        start_time.elapsed()
    );

    Ok(school_ids)
}

pub async fn insert_schools_batch(
    db: &PgPool,
    schools: &[SchoolSeed],
) -> Result<Vec<SchoolId>, Box<dyn std::error::Error>> {
    // 3 params per school
    const BATCH_SIZE: usize = 500;

    let mut tx = db.begin().await?;
    let mut all_ids = Vec::with_capacity(schools.len());

    for chunk in schools.chunks(BATCH_SIZE) {
        all_ids.extend(insert_schools_chunk(&mut tx, chunk).await?);
    }

    tx.commit().await?;
    Ok(all_ids)
}

async fn insert_schools_chunk(
    tx: &mut Transaction<'_, Postgres>,
    schools: &[SchoolSeed],
) -> Result<Vec<SchoolId>, Box<dyn std::error::Error>> {
    if schools.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO schools (name, address, contact_info) ");
    qb.push_values(schools, |mut row, school| {
        row.push_bind(&school.name)
            .push_bind(&school.address)
            .push_bind(&school.contact_info);
    });
    qb.push(" RETURNING id");

    let ids = qb.build_query_scalar().fetch_all(&mut **tx).await?;
    Ok(ids)
}

/// Pairs `school_ids[i]` with `director_ids[i]`.
pub async fn assign_directors(
    db: &PgPool,
    school_ids: &[SchoolId],
    director_ids: &[UserId],
) -> Result<u64, Box<dyn std::error::Error>> {
    let updated = sqlx::query(
        "UPDATE schools AS sc
         SET director_id = d.director_id, updated_at = NOW()
         FROM UNNEST($1::uuid[], $2::uuid[]) AS d(school_id, director_id)
         WHERE sc.id = d.school_id",
    )
    .bind(school_ids)
    .bind(director_ids)
    .execute(db)
    .await?
    .rows_affected();

    println!("   ✓ Assigned {} directors", updated);

    Ok(updated)
}

/// Levels and classes go with their schools.
pub async fn clear_schools(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing schools...");

    let result = sqlx::query("DELETE FROM schools")
        .execute(db)
        .await?
        .rows_affected();

    println!(
        "   ✓ Deleted {} schools in {:?}",
        result,
        start_time.elapsed()
    );

    Ok(result)
}
