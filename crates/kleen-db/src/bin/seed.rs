//! # Seed Data
//!
//! Populates a fresh database with staff accounts, the service catalog and
//! default settings.
//!
//! ## Usage
//! ```bash
//! # Seed ./kleen.db with the default staff password
//! cargo run -p kleen-db --bin seed
//!
//! # Specify database path and staff password
//! cargo run -p kleen-db --bin seed -- --db ./data/kleen.db --password s3cret
//! ```
//!
//! ## Seeded Data
//! - Staff: `admin` (admin), `beni`, `erika`, `clara` (staff), `driver` (driver)
//! - Catalog: wash & fold by the pound, dry cleaning, pressing, alterations
//! - Settings: `tax_rate` 8.875, business profile
//!
//! Services are upserted by id, so re-running refreshes catalog prices.
//! Staff accounts are only created when the users table is empty.

use std::env;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use kleen_core::{Role, Service, ServiceUnit};
use kleen_db::{Database, DbConfig, NewUser};

/// (username, display name, role)
const STAFF: &[(&str, &str, Role)] = &[
    ("admin", "Admin", Role::Admin),
    ("beni", "Beni", Role::Staff),
    ("erika", "Erika", Role::Staff),
    ("clara", "Clara", Role::Staff),
    ("driver", "Driver", Role::Driver),
];

/// (id, name, category, price cents, unit)
const CATALOG: &[(i64, &str, &str, i64, ServiceUnit)] = &[
    (1, "Wash & Fold", "Laundry", 140, ServiceUnit::Lb),
    (2, "Wash & Fold Express", "Laundry", 200, ServiceUnit::Lb),
    (3, "Comforter", "Laundry", 2500, ServiceUnit::Item),
    (10, "Dry Clean Shirt", "Dry Cleaning", 450, ServiceUnit::Item),
    (11, "Dry Clean Pants", "Dry Cleaning", 750, ServiceUnit::Item),
    (12, "Dry Clean Suit (2pc)", "Dry Cleaning", 1800, ServiceUnit::Item),
    (13, "Dry Clean Dress", "Dry Cleaning", 1500, ServiceUnit::Item),
    (14, "Dry Clean Coat", "Dry Cleaning", 2200, ServiceUnit::Item),
    (20, "Press Shirt", "Pressing", 350, ServiceUnit::Item),
    (21, "Press Pants", "Pressing", 500, ServiceUnit::Item),
    (30, "Hem Pants", "Alterations", 1200, ServiceUnit::Item),
    (31, "Replace Zipper", "Alterations", 1800, ServiceUnit::Item),
    (32, "Sew Button", "Alterations", 300, ServiceUnit::Item),
];

const SETTINGS: &[(&str, &str)] = &[
    ("tax_rate", "8.875"),
    ("business_name", "Kleen Panda"),
    ("business_phone", "2125550100"),
    ("business_address", "123 Canal St, New York, NY"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./kleen.db");
    let mut password = String::from("kleenpanda");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--password" | "-p" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kleen POS Seed Data");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>         Database file path (default: ./kleen.db)");
                println!("  -p, --password <PASS>   Password for seeded staff (default: kleenpanda)");
                println!("  -h, --help              Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Kleen POS Seed Data");
    println!("======================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Staff
    let existing = db.users().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} users, skipping staff", existing);
    } else {
        for (username, name, role) in STAFF {
            let salt = SaltString::generate(&mut OsRng);
            let password_hash = Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| format!("password hashing failed: {e}"))?
                .to_string();

            db.users()
                .create(NewUser {
                    username: username.to_string(),
                    name: name.to_string(),
                    role: *role,
                    password_hash,
                })
                .await?;
            println!("  + {} ({})", username, role);
        }
        println!("✓ Created {} staff accounts", STAFF.len());
    }

    // Catalog
    for (sort_order, (id, name, category, price, unit)) in CATALOG.iter().enumerate() {
        db.services()
            .upsert(&Service {
                id: *id,
                name: name.to_string(),
                category: category.to_string(),
                unit_price_cents: *price,
                unit: *unit,
                description: None,
                active: true,
                sort_order: sort_order as i64 + 1,
            })
            .await?;
    }
    println!("✓ Upserted {} services", CATALOG.len());

    // Settings
    for (key, value) in SETTINGS {
        if db.settings().get(key).await?.is_none() {
            db.settings().set(key, value).await?;
        }
    }
    println!("✓ Settings: {:?}", db.settings().all().await?);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
