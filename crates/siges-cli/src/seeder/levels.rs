//! Level and class generation.

use rayon::prelude::*;
use siges_models::{ClassId, Cycle, LevelId, SchoolId};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Instant;

use super::models::{ClassSeed, LevelSeed};

const LEVELS: [(&str, Cycle); 16] = [
    ("Petite Section", Cycle::Preschool),
    ("Moyenne Section", Cycle::Preschool),
    ("Grande Section", Cycle::Preschool),
    ("CP", Cycle::Primary),
    ("CE1", Cycle::Primary),
    ("CE2", Cycle::Primary),
    ("CM1", Cycle::Primary),
    ("CM2", Cycle::Primary),
    ("6ème", Cycle::LowerSecondary),
    ("5ème", Cycle::LowerSecondary),
    ("4ème", Cycle::LowerSecondary),
    ("3ème", Cycle::LowerSecondary),
    ("Seconde", Cycle::UpperSecondary),
    ("Première", Cycle::UpperSecondary),
    ("Terminale", Cycle::UpperSecondary),
    ("Terminale Plus", Cycle::UpperSecondary),
];

/// Primary levels first, so the default six cover CP to 6ème.
fn level_at(i: usize) -> (String, Cycle) {
    let (name, cycle) = LEVELS[(i + 3) % LEVELS.len()];
    let round = (i + 3) / LEVELS.len();
    if round == 0 {
        (name.to_string(), cycle)
    } else {
        (format!("{} {}", name, round + 1), cycle)
    }
}

fn class_name(i: usize) -> String {
    let letter = char::from(b'A' + (i % 26) as u8);
    match i / 26 {
        0 => letter.to_string(),
        n => format!("{}{}", letter, n + 1),
    }
}

pub fn generate_levels(school_ids: &[SchoolId], levels_per_school: usize) -> Vec<LevelSeed> {
    school_ids
        .par_iter()
        .flat_map(|&school_id| {
            (0..levels_per_school)
                .map(|i| {
                    let (name, cycle) = level_at(i);
                    LevelSeed {
                        name,
                        cycle,
                        school_id,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn generate_classes(
    level_ids: &[LevelId],
    classes_per_level: usize,
    academic_year: &str,
) -> Vec<ClassSeed> {
    level_ids
        .par_iter()
        .flat_map(|&level_id| {
            (0..classes_per_level)
                .map(|i| ClassSeed {
                    name: class_name(i),
                    academic_year: academic_year.to_string(),
                    level_id,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub async fn seed_levels(
    db: &PgPool,
    school_ids: &[SchoolId],
    levels_per_school: usize,
) -> Result<Vec<LevelId>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!(
        "📊 Seeding {} levels ({} per school)...",
        school_ids.len() * levels_per_school,
        levels_per_school
    );

    let levels = generate_levels(school_ids, levels_per_school);

    let mut tx = db.begin().await?;
    let mut level_ids = Vec::with_capacity(levels.len());
    for chunk in levels.chunks(500) {
        level_ids.extend(insert_levels_chunk(&mut tx, chunk).await?);
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} levels in {:?}",
        level_ids.len(),
        start_time.elapsed()
    );

    Ok(level_ids)
}

pub async fn seed_classes(
    db: &PgPool,
    level_ids: &[LevelId],
    classes_per_level: usize,
    academic_year: &str,
) -> Result<Vec<ClassId>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!(
        "🏷️  Seeding {} classes ({} per level, {})...",
        level_ids.len() * classes_per_level,
        classes_per_level,
        academic_year
    );

    let classes = generate_classes(level_ids, classes_per_level, academic_year);

    let mut tx = db.begin().await?;
    let mut class_ids = Vec::with_capacity(classes.len());
    for chunk in classes.chunks(500) {
        class_ids.extend(insert_classes_chunk(&mut tx, chunk).await?);
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} classes in {:?}",
        class_ids.len(),
        start_time.elapsed()
    );

    Ok(class_ids)
}

async fn insert_levels_chunk(
    tx: &mut Transaction<'_, Postgres>,
    levels: &[LevelSeed],
) -> Result<Vec<LevelId>, Box<dyn std::error::Error>> {
    if levels.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO levels (name, cycle, school_id) ");
    qb.push_values(levels, |mut row, level| {
        row.push_bind(&level.name)
            .push_bind(level.cycle)
            .push_bind(level.school_id);
    });
    qb.push(" RETURNING id");

    let ids = qb.build_query_scalar().fetch_all(&mut **tx).await?;
    Ok(ids)
}

async fn insert_classes_chunk(
    tx: &mut Transaction<'_, Postgres>,
    classes: &[ClassSeed],
) -> Result<Vec<ClassId>, Box<dyn std::error::Error>> {
    if classes.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb =
        QueryBuilder::<Postgres>::new("INSERT INTO classes (name, academic_year, level_id) ");
    qb.push_values(classes, |mut row, class| {
        row.push_bind(&class.name)
            .push_bind(&class.academic_year)
            .push_bind(class.level_id);
    });
    qb.push(" RETURNING id");

    let ids = qb.build_query_scalar().fetch_all(&mut **tx).await?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn level_names_are_unique_within_a_school() {
        let names: HashSet<String> = (0..40).map(|i| level_at(i).0).collect();
        assert_eq!(names.len(), 40);
    }

    #[test]
    fn first_level_is_primary() {
        assert_eq!(level_at(0), ("CP".to_string(), Cycle::Primary));
    }

    #[test]
    fn class_names_wrap_after_z() {
        assert_eq!(class_name(0), "A");
        assert_eq!(class_name(25), "Z");
        assert_eq!(class_name(26), "A2");
    }
}
