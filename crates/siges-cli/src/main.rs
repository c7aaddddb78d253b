use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use sqlx::PgPool;

use siges_cli::admin::create_super_admin;
use siges_cli::seeder::{self, LevelsPerSchool, SeedConfig, StaffPerSchool};

#[derive(Parser)]
#[command(name = "siges-cli")]
#[command(about = "SIGES CLI - Administrative tools for SIGES", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a super-admin account
    CreateSuperadmin {
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        #[arg(short = 'l', long)]
        last_name: Option<String>,

        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Prompted for if omitted
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Seed fake schools with directors, staff, levels, classes, students and parents
    Seed {
        #[arg(short = 's', long, default_value = "3")]
        schools: usize,

        #[arg(long, default_value = "1")]
        admins: usize,

        #[arg(long, default_value = "4")]
        teachers: usize,

        #[arg(long, default_value = "1")]
        accountants: usize,

        /// Levels per school
        #[arg(long, default_value = "6")]
        levels: usize,

        /// Classes per level
        #[arg(long, default_value = "2")]
        classes: usize,

        /// Students per class
        #[arg(long, default_value = "20")]
        students: usize,

        /// Siblings sharing one parent account
        #[arg(long, default_value = "2")]
        siblings: usize,
    },
    /// Seed students and parents into existing classes
    SeedStudents {
        #[arg(long, default_value = "20")]
        students: usize,

        #[arg(long, default_value = "2")]
        siblings: usize,
    },
    /// Clear all seeded data (keeps super-admins)
    ClearSeed,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        fail("DATABASE_URL must be set");
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => fail(&format!("Failed to connect to database: {}", e)),
    };

    let cli = Cli::parse();

    match cli.command {
        Commands::CreateSuperadmin {
            first_name,
            last_name,
            email,
            password,
        } => handle_create_superadmin(&pool, first_name, last_name, email, password).await,
        Commands::Seed {
            schools,
            admins,
            teachers,
            accountants,
            levels,
            classes,
            students,
            siblings,
        } => {
            let config = SeedConfig::new(schools)
                .with_staff(StaffPerSchool {
                    admins,
                    teachers,
                    accountants,
                })
                .with_levels(LevelsPerSchool {
                    count: levels,
                    classes_per_level: classes,
                    students_per_class: students,
                    students_per_parent: siblings,
                });

            if let Err(e) = seeder::seed_all(&pool, config).await {
                fail(&format!("Error seeding database: {}", e));
            }
        }
        Commands::SeedStudents { students, siblings } => {
            match seeder::seed_students_only(&pool, students, siblings).await {
                Ok(count) => println!("✅ Created {} students", count),
                Err(e) => fail(&format!("Error seeding students: {}", e)),
            }
        }
        Commands::ClearSeed => {
            if let Err(e) = seeder::clear_all(&pool).await {
                fail(&format!("Error clearing seeded data: {}", e));
            }
        }
    }
}

async fn handle_create_superadmin(
    pool: &PgPool,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) {
    let first_name = first_name.unwrap_or_else(|| prompt("First name"));
    let last_name = last_name.unwrap_or_else(|| prompt("Last name"));
    let email = email.unwrap_or_else(|| prompt("Email address"));
    let password = password.unwrap_or_else(|| {
        Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .unwrap_or_else(|e| fail(&format!("Failed to read password: {}", e)))
    });

    match create_super_admin(pool, &first_name, &last_name, &email, &password).await {
        Ok(id) => {
            println!("\n✅ Super-admin created successfully!");
            println!("   ID: {}", id);
            println!("   Email: {}", email.trim().to_lowercase());
            println!("   Name: {} {}", first_name, last_name);
        }
        Err(e) => fail(&format!("Error creating super-admin: {}", e)),
    }
}

fn prompt(label: &str) -> String {
    Input::new()
        .with_prompt(label)
        .interact_text()
        .unwrap_or_else(|e| fail(&format!("Failed to read {}: {}", label.to_lowercase(), e)))
}

fn fail(message: &str) -> ! {
    eprintln!("\n❌ {}", message);
    std::process::exit(1);
}
