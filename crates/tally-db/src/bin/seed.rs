//! # Seed Data Generator
//!
//! Populates a development database with catalog products and opening
//! stock so the engine has something to sell.
//!
//! ## Usage
//! ```bash
//! # Generate 500 products (default)
//! cargo run -p tally-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tally-db --bin seed -- --count 2000
//!
//! # Specify database path / business
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db --business biz-dev
//! ```
//!
//! Each product gets a unique SKU (`{CATEGORY}-{NNN}`), a price derived
//! from a deterministic seed, a cost at 55-75% of price, and opening
//! stock recorded the honest way: an `arrival` movement plus the matching
//! counter update, never a bare counter write.

use chrono::Utc;
use std::env;
use uuid::Uuid;

use tally_core::{MovementKind, Product, StockMovement, DEFAULT_TENANT_ID};
use tally_db::repository::movement::MovementRepository;
use tally_db::repository::product::ProductRepository;
use tally_db::{Database, DbConfig};

/// Product categories for realistic test data.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Cola 330ml",
            "Cola 500ml",
            "Lemon Soda",
            "Orange Juice",
            "Apple Juice",
            "Still Water",
            "Sparkling Water",
            "Energy Drink",
            "Iced Tea",
            "Cold Brew",
        ],
    ),
    (
        "SNK",
        &[
            "Salted Chips",
            "Paprika Chips",
            "Tortilla Chips",
            "Chocolate Bar",
            "Peanut Bar",
            "Gummy Mix",
            "Cookies",
            "Crackers",
            "Trail Mix",
            "Pretzels",
        ],
    ),
    (
        "GRO",
        &[
            "White Bread",
            "Wheat Bread",
            "Spaghetti",
            "Penne",
            "White Rice",
            "Brown Rice",
            "Canned Beans",
            "Canned Corn",
            "Tomato Sauce",
            "Olive Oil",
        ],
    ),
    (
        "HHG",
        &[
            "Paper Towels",
            "Dish Soap",
            "Laundry Pods",
            "Trash Bags",
            "Sponges",
            "Batteries AA",
            "Batteries AAA",
            "Light Bulb",
            "Matches",
            "Candles",
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./tally_dev.db");
    let mut business_id = String::from("biz-dev");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--business" | "-b" => {
                if i + 1 < args.len() {
                    business_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>       Number of products to generate (default: 500)");
                println!("  -d, --db <PATH>       Database file path (default: ./tally_dev.db)");
                println!("  -b, --business <ID>   Business id to seed (default: biz-dev)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally Seed Data Generator");
    println!("=========================");
    println!("Database: {}", db_path);
    println!("Business: {}", business_id);
    println!("Products: {}", count);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("Connected, migrations applied");

    let existing = db.products().count(&business_id).await?;
    if existing > 0 {
        println!("Database already has {} products for {}", existing, business_id);
        println!("Skipping seed to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category_code, names) in CATEGORIES {
        for (name_idx, name) in names.iter().enumerate() {
            for variant in 0..((count / (CATEGORIES.len() * names.len())) + 1) {
                if generated >= count {
                    break 'outer;
                }

                let seed = generated * 31 + name_idx * 7 + variant;
                let product = generate_product(&business_id, category_code, name, seed);
                let opening_stock = (seed % 101) as i64;

                db.products().insert(&product).await?;

                // Opening stock goes through the ledger like any other change
                if opening_stock > 0 {
                    let mut tx = db.begin().await?;
                    MovementRepository::insert_tx(
                        &mut tx,
                        &StockMovement {
                            id: Uuid::new_v4().to_string(),
                            product_id: product.id.clone(),
                            business_id: business_id.clone(),
                            quantity_delta: opening_stock,
                            kind: MovementKind::Arrival,
                            reason: "seed opening stock".to_string(),
                            actor: "seed".to_string(),
                            created_at: Utc::now(),
                        },
                    )
                    .await?;
                    ProductRepository::apply_stock_delta(&mut tx, &product.id, opening_stock)
                        .await?;
                    tx.commit().await?;
                }

                generated += 1;

                if generated % 100 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("Generated {} products in {:?}", generated, elapsed);

    let total = db.products().count(&business_id).await?;
    println!("Catalog now holds {} active products", total);
    println!();
    println!("Seed complete!");

    Ok(())
}

/// Generates a single product with deterministic pseudo-random data.
fn generate_product(business_id: &str, category: &str, name: &str, seed: usize) -> Product {
    let now = Utc::now();

    let sku = format!("{}-{:04}", category, seed);

    // Price: $0.99 - $8.99 derived from the seed
    let price_cents = 99 + ((seed * 17) % 800) as i64;

    // Cost: 55-75% of price
    let cost_pct = 55 + (seed % 20) as i64;
    let cost_cents = price_cents * cost_pct / 100;

    Product {
        id: Uuid::new_v4().to_string(),
        tenant_id: DEFAULT_TENANT_ID.to_string(),
        business_id: business_id.to_string(),
        sku,
        name: name.to_string(),
        price_cents,
        cost_cents,
        current_stock: 0,
        track_inventory: true,
        allow_negative_stock: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
