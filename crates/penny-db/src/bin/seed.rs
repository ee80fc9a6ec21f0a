//! # Seed Data Generator
//!
//! Populates the database with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default) into the configured database
//! cargo run -p penny-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p penny-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p penny-db --bin seed -- --db ./data/penny.db
//! ```
//!
//! Products are spread over a handful of categories, named
//! `{product} {size}`, with deterministic prices and stock levels. Once every
//! product/size pair is used the catalog repeats with a batch suffix
//! (`Cola Small #2`), so any count can be met.

use std::env;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use penny_core::{NewCategory, NewProduct, PageParams};
use penny_db::{schema, Database, DbConfig, DbResult};

const DEFAULT_COUNT: usize = 200;

/// Demo categories and the products in each.
const CATALOG: &[(&str, &[&str])] = &[
    (
        "Drinks",
        &[
            "Cola",
            "Diet Cola",
            "Lemon Soda",
            "Orange Juice",
            "Apple Juice",
            "Iced Tea",
            "Sparkling Water",
            "Still Water",
        ],
    ),
    (
        "Snacks",
        &[
            "Salted Chips",
            "Paprika Chips",
            "Pretzels",
            "Peanuts",
            "Chocolate Bar",
            "Gummy Bears",
        ],
    ),
    (
        "Dairy",
        &[
            "Whole Milk",
            "Oat Milk",
            "Greek Yogurt",
            "Cheddar Cheese",
            "Butter",
        ],
    ),
    (
        "Bakery",
        &["White Bread", "Rye Bread", "Croissant", "Bagel", "Muffin"],
    ),
];

/// Size names and their price addon in cents.
const SIZES: &[(&str, i64)] = &[("Small", 0), ("Medium", 60), ("Large", 120), ("Family", 250)];

struct Args {
    count: usize,
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,penny=debug,sqlx=warn")),
        )
        .init();

    let Some(args) = parse_args() else {
        return Ok(());
    };

    let mut config = DbConfig::load(None)?;
    if let Some(path) = args.db_path {
        config.database_path = path;
    }
    info!(path = %config.database_path.display(), count = args.count, "Seeding");

    let db = Database::open(&config).await?;
    schema::apply(&db).await?;

    let existing = db.products().get_page(&PageParams::new().limit(1)).await?.total;
    if existing > 0 {
        warn!(existing, "Database already has products; skipping seed");
        return Ok(());
    }

    let start = Instant::now();
    let generated = seed_catalog(&db, args.count).await?;
    let elapsed = start.elapsed();
    info!(
        generated,
        ?elapsed,
        rate = generated as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        "Catalog generated"
    );

    for phrase in ["cola", "milk oat", "chips salted family"] {
        let page = db
            .products()
            .search_page(&PageParams::search(phrase, &["name", "description"]).limit(5))
            .await?;
        info!(phrase, total = page.total, "Sample search");
    }

    Ok(())
}

/// `None` when `--help` was requested.
fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        count: DEFAULT_COUNT,
        db_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    parsed.count = args[i + 1].parse().unwrap_or(DEFAULT_COUNT);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    parsed.db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Penny POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --db <PATH>    Database file path (default: from penny.toml)");
                println!("  -h, --help         Show this help message");
                return None;
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }
    Some(parsed)
}

/// Inserts the categories and `count` products in one transaction.
async fn seed_catalog(db: &Database, count: usize) -> DbResult<usize> {
    let conn = db.clone();
    db.tx(move || async move {
        let categories = conn.categories();
        let products = conn.products();

        let mut category_ids = Vec::with_capacity(CATALOG.len());
        for (category_name, _) in CATALOG {
            let category = categories
                .create(&NewCategory {
                    name: category_name.to_string(),
                })
                .await?;
            category_ids.push(category.id);
        }

        for index in 0..count {
            let slot = catalog_slot(index);
            let mut product = demo_product(
                slot.name,
                slot.size,
                slot.price_addon,
                category_ids[slot.category],
                slot.seed,
            );
            if slot.batch > 0 {
                product.name = format!("{} #{}", product.name, slot.batch + 1);
            }
            products.create(&product).await?;
        }
        Ok(count)
    })
    .await
}

/// Where the `index`-th generated product comes from in [`CATALOG`] × [`SIZES`].
#[derive(Debug, PartialEq)]
struct CatalogSlot {
    category: usize,
    name: &'static str,
    size: &'static str,
    price_addon: i64,
    /// How many full passes over the catalog came before this one.
    batch: usize,
    seed: usize,
}

fn catalog_size() -> usize {
    CATALOG.iter().map(|(_, names)| names.len()).sum::<usize>() * SIZES.len()
}

fn catalog_slot(index: usize) -> CatalogSlot {
    let batch = index / catalog_size();
    let mut rest = index % catalog_size();

    for (category, (_, names)) in CATALOG.iter().enumerate() {
        let span = names.len() * SIZES.len();
        if rest < span {
            let product_idx = rest / SIZES.len();
            let size_idx = rest % SIZES.len();
            let (size, price_addon) = SIZES[size_idx];
            return CatalogSlot {
                category,
                name: names[product_idx],
                size,
                price_addon,
                batch,
                seed: batch * 7 + category * 1000 + product_idx * 20 + size_idx,
            };
        }
        rest -= span;
    }
    unreachable!("index is reduced modulo the catalog size")
}

fn demo_product(name: &str, size: &str, price_addon: i64, category_id: i64, seed: usize) -> NewProduct {
    // base 0.99 - 8.98 plus the size addon
    let price = 99 + ((seed * 17) % 800) as i64 + price_addon;
    // cost is 60-80% of price
    let cost = price * (60 + (seed % 20) as i64) / 100;

    NewProduct {
        name: format!("{} {}", name, size),
        description: Some(format!("{} ({})", name, size.to_lowercase())),
        category_id: Some(category_id),
        price,
        cost,
        stock: Some((seed % 101) as i64),
    }
}
