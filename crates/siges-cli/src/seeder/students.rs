//! Student generation. Students of a class are grouped into families of
//! siblings, each family sharing one parent account.

use chrono::NaiveDate;
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rayon::prelude::*;
use siges_models::{ClassId, Gender, Role, StudentId, UserId};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Instant;

use super::models::{StudentSeed, UserSeed};
use super::users::{insert_users_batch, named_user};

pub struct FamilySeed {
    pub parent: UserSeed,
    pub children: Vec<StudentSeed>,
}

pub fn generate_families(
    class_ids: &[ClassId],
    students_per_class: usize,
    students_per_parent: usize,
    password_hash: &str,
) -> Vec<FamilySeed> {
    let family_size = students_per_parent.max(1);

    class_ids
        .par_iter()
        .enumerate()
        .flat_map(|(class_idx, &class_id)| {
            (0..students_per_class)
                .step_by(family_size)
                .enumerate()
                .map(|(family_idx, first)| {
                    let last_name: String = LastName().fake();
                    let size = family_size.min(students_per_class - first);
                    let children = (0..size)
                        .map(|_| generate_student(class_id, last_name.clone()))
                        .collect();
                    let parent = named_user(
                        Role::Parent,
                        None,
                        FirstName().fake(),
                        last_name,
                        class_idx,
                        family_idx,
                        password_hash,
                    );
                    FamilySeed { parent, children }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn generate_student(school_class_id: ClassId, last_name: String) -> StudentSeed {
    let gender = match (0..2).fake::<u8>() {
        0 => Gender::Male,
        _ => Gender::Female,
    };
    let date_of_birth = NaiveDate::from_ymd_opt(
        (2006..2021).fake::<i32>(),
        (1..13).fake::<u32>(),
        (1..29).fake::<u32>(),
    )
    .unwrap_or_default();

    StudentSeed {
        first_name: FirstName().fake(),
        last_name,
        date_of_birth,
        gender,
        school_class_id,
    }
}

/// Inserts parents, then their children, then the links between them.
pub async fn seed_students(
    db: &PgPool,
    class_ids: &[ClassId],
    students_per_class: usize,
    students_per_parent: usize,
    password_hash: &str,
) -> Result<(usize, usize), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!(
        "🎓 Seeding {} students ({} per class)...",
        class_ids.len() * students_per_class,
        students_per_class
    );

    let families = generate_families(
        class_ids,
        students_per_class,
        students_per_parent,
        password_hash,
    );

    let (parents, children): (Vec<UserSeed>, Vec<Vec<StudentSeed>>) = families
        .into_iter()
        .map(|family| (family.parent, family.children))
        .unzip();

    let parent_ids = insert_users_batch(db, &parents).await?;

    let mut links = Vec::new();
    let mut students = Vec::new();
    for (parent_id, kids) in parent_ids.iter().zip(children) {
        links.extend(std::iter::repeat_n(*parent_id, kids.len()));
        students.extend(kids);
    }

    let mut tx = db.begin().await?;
    let mut student_ids = Vec::with_capacity(students.len());
    // 5 params per student
    for chunk in students.chunks(1000) {
        student_ids.extend(insert_students_chunk(&mut tx, chunk).await?);
    }
    link_parents(&mut tx, &student_ids, &links).await?;
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} students and {} parents in {:?}",
        student_ids.len(),
        parent_ids.len(),
        start_time.elapsed()
    );

    Ok((student_ids.len(), parent_ids.len()))
}

async fn insert_students_chunk(
    tx: &mut Transaction<'_, Postgres>,
    students: &[StudentSeed],
) -> Result<Vec<StudentId>, Box<dyn std::error::Error>> {
    if students.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO students (first_name, last_name, date_of_birth, gender, school_class_id) ",
    );
    qb.push_values(students, |mut row, student| {
        row.push_bind(&student.first_name)
            .push_bind(&student.last_name)
            .push_bind(student.date_of_birth)
            .push_bind(student.gender)
            .push_bind(student.school_class_id);
    });
    qb.push(" RETURNING id");

    let ids = qb.build_query_scalar().fetch_all(&mut **tx).await?;
    Ok(ids)
}

async fn link_parents(
    tx: &mut Transaction<'_, Postgres>,
    student_ids: &[StudentId],
    parent_ids: &[UserId],
) -> Result<u64, Box<dyn std::error::Error>> {
    let linked = sqlx::query(
        "INSERT INTO student_parents (student_id, parent_id)
         SELECT * FROM UNNEST($1::uuid[], $2::uuid[])",
    )
    .bind(student_ids)
    .bind(parent_ids)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    Ok(linked)
}

/// Parent links go with the students.
pub async fn clear_students(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing students...");

    let result = sqlx::query("DELETE FROM students")
        .execute(db)
        .await?
        .rows_affected();

    println!(
        "   ✓ Deleted {} students in {:?}",
        result,
        start_time.elapsed()
    );

    Ok(result)
}
