//! # Seed Data Generator
//!
//! Populates a database with demo locations, stock, supply and
//! reservations for development.
//!
//! ## Usage
//! ```bash
//! # Seed 40 units (default)
//! cargo run -p stockroom-db --bin seed
//!
//! # Custom amount
//! cargo run -p stockroom-db --bin seed -- --units 200
//!
//! # Specify database path
//! cargo run -p stockroom-db --bin seed -- --db ./data/stockroom.db
//! ```
//!
//! ## Generated Data
//! - Three locations: a warehouse, a store and a dropship partner
//! - Units `{STYLE}-{COLOR}-{SIZE}` with on-hand stock in the warehouse and
//!   store, and a safety buffer in the store
//! - One purchase order per style with a line per size, ETA 1-4 weeks out
//! - A handful of on-hand and incoming reservations

use std::env;

use chrono::{Duration, Utc};
use stockroom_core::requests::{
    AdjustOnHand, NewLocation, NewPurchaseOrder, NewSupplyLine, ReserveIncoming, ReserveOnHand,
    SetSafetyStock,
};
use stockroom_core::{Address, LocationKind};
use stockroom_db::{Database, DbConfig};

/// Demo locations: (code, name, kind, city).
const LOCATIONS: &[(&str, &str, LocationKind, &str)] = &[
    ("WH-UK-01", "Leeds Warehouse", LocationKind::Warehouse, "Leeds"),
    ("ST-LDN-01", "London Flagship", LocationKind::Store, "London"),
    ("DS-EU-01", "EU Dropship Partner", LocationKind::Dropship, "Rotterdam"),
];

const STYLES: &[&str] = &["TEE", "HOODIE", "CHINO", "DENIM", "PARKA"];
const COLORS: &[&str] = &["BLK", "NVY", "OLV", "SND"];
const SIZES: &[&str] = &["XS", "S", "M", "L", "XL", "XXL"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut units: usize = 40;
    let mut db_path = String::from("./stockroom_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--units" | "-u" => {
                if i + 1 < args.len() {
                    units = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --units <N>    Number of units to stock (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockroom_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockroom Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Units:    {}", units);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if !db.locations().list().await?.is_empty() {
        println!("⚠ Database already has locations");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for (code, name, kind, city) in LOCATIONS {
        db.locations()
            .register(&NewLocation {
                code: code.to_string(),
                name: name.to_string(),
                kind: *kind,
                address: Address {
                    city: Some(city.to_string()),
                    ..Address::default()
                },
            })
            .await?;
    }
    println!("✓ Registered {} locations", LOCATIONS.len());

    let (warehouse, store) = (LOCATIONS[0].0, LOCATIONS[1].0);
    let start = std::time::Instant::now();
    let today = Utc::now().date_naive();

    let unit_ids: Vec<String> = STYLES
        .iter()
        .flat_map(|style| {
            COLORS.iter().flat_map(move |color| {
                SIZES.iter().map(move |size| format!("{style}-{color}-{size}"))
            })
        })
        .take(units)
        .collect();

    let mut seeded = 0;
    for (idx, unit_id) in unit_ids.iter().enumerate() {
        let on_hand = 20 + ((idx * 37) % 180) as i64;
        adjust(&db, unit_id, warehouse, on_hand).await?;
        adjust(&db, unit_id, store, (idx % 12) as i64 + 1).await?;
        db.adjustments()
            .set_safety_stock(&SetSafetyStock {
                unit_id: unit_id.clone(),
                location_id: store.to_string(),
                safety_stock: 2,
                actor: Some("seed".to_string()),
            })
            .await?;

        seeded += 1;
        if seeded % 20 == 0 {
            println!("  Stocked {} units...", seeded);
        }
    }
    println!("✓ Stocked {} units", seeded);

    // One purchase order per style, one line per unit of that style
    let mut lines = 0;
    for (week, style) in STYLES.iter().enumerate() {
        let style_units: Vec<&String> = unit_ids
            .iter()
            .filter(|u| u.starts_with(&format!("{style}-")))
            .collect();
        if style_units.is_empty() {
            continue;
        }

        let order = db
            .purchasing()
            .create_order(&NewPurchaseOrder {
                supplier_ref: Some(format!("SUP-{style}")),
            })
            .await?;
        for unit_id in style_units {
            db.purchasing()
                .add_line(
                    &order.id,
                    &NewSupplyLine {
                        unit_id: unit_id.clone(),
                        location_id: warehouse.to_string(),
                        qty: 120,
                        eta: today + Duration::weeks(week as i64 % 4 + 1),
                        actor: Some("seed".to_string()),
                    },
                )
                .await?;
            lines += 1;
        }
    }
    println!("✓ Placed {} supply lines", lines);

    let mut reservations = 0;
    for (idx, unit_id) in unit_ids.iter().enumerate().step_by(3) {
        let order_id = format!("ORD-{:05}", 10_000 + idx);
        let result = if idx % 2 == 0 {
            db.reservations()
                .reserve_on_hand(&ReserveOnHand {
                    order_id,
                    order_line_id: "1".to_string(),
                    unit_id: unit_id.clone(),
                    location_id: warehouse.to_string(),
                    qty: 3,
                    expires_at: Some(Utc::now() + Duration::hours(24)),
                    actor: Some("seed".to_string()),
                })
                .await
        } else {
            db.reservations()
                .reserve_incoming(&ReserveIncoming {
                    order_id,
                    order_line_id: "1".to_string(),
                    unit_id: unit_id.clone(),
                    location_id: warehouse.to_string(),
                    qty: 10,
                    expires_at: None,
                    actor: Some("seed".to_string()),
                })
                .await
        };

        match result {
            Ok(_) => reservations += 1,
            Err(e) => eprintln!("Failed to reserve {}: {}", unit_id, e),
        }
    }

    let elapsed = start.elapsed();
    println!("✓ Created {} reservations", reservations);
    println!();

    // Sanity check: the ledger must replay to every stored on-hand
    let drifted: Vec<_> = db
        .reconciliation()
        .reconcile_all()
        .await?
        .into_iter()
        .filter(|r| !r.is_consistent())
        .collect();
    println!("Reconciliation: {} drifted records", drifted.len());
    for report in &drifted {
        println!("  {}", serde_json::to_string(report)?);
    }

    println!();
    println!("✓ Seed complete in {:?}!", elapsed);

    Ok(())
}

async fn adjust(
    db: &Database,
    unit_id: &str,
    location_id: &str,
    qty: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    db.adjustments()
        .adjust_on_hand(&AdjustOnHand {
            unit_id: unit_id.to_string(),
            location_id: location_id.to_string(),
            delta: qty,
            note: Some("opening balance".to_string()),
            actor: Some("seed".to_string()),
        })
        .await?;
    Ok(())
}
