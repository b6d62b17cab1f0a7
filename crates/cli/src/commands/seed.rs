//! Seed the database with the sample catalog.
//!
//! Inserts two categories and a small set of products (desalination units
//! and data subscriptions) with sustainability notes, mirroring the demo
//! store. Existing slugs are left untouched, so the command is safe to
//! re-run.

use rust_decimal::Decimal;
use secrecy::SecretString;
use tracing::info;

use bluewave_core::{CategoryType, CurrencyCode, Money, ProductStatus, ProductType};
use bluewave_server::db;
use bluewave_server::db::products::{NewProduct, ProductRepository};

/// One seed entry.
struct SeedProduct {
    name: &'static str,
    short_description: &'static str,
    description: &'static str,
    environmental_notes: &'static str,
    product_type: ProductType,
    price_cents: i64,
    compare_at_cents: Option<i64>,
    sku: &'static str,
    stock_quantity: i32,
    featured: bool,
}

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "AquaPure Compact",
        short_description: "Solar-powered desalination for personal use",
        description: "Compact solar desalination unit producing up to 50 liters \
                      of fresh water per day. Designed for off-grid homes and boats.",
        environmental_notes: "Zero-emission operation; 95% recyclable housing; \
                              saves ~18,000 plastic bottles per year.",
        product_type: ProductType::DesalinationUnit,
        price_cents: 299_999,
        compare_at_cents: Some(349_999),
        sku: "BW-AP-COMPACT",
        stock_quantity: 25,
        featured: true,
    },
    SeedProduct {
        name: "AquaPure Professional",
        short_description: "Hybrid-powered unit for small businesses",
        description: "Mid-range desalination unit with hybrid solar/battery power \
                      and 500 liters per day output.",
        environmental_notes: "Energy recovery module cuts power draw by 40% \
                              compared to conventional reverse osmosis.",
        product_type: ProductType::DesalinationUnit,
        price_cents: 799_999,
        compare_at_cents: Some(899_999),
        sku: "BW-AP-PRO",
        stock_quantity: 10,
        featured: true,
    },
    SeedProduct {
        name: "AquaPure Industrial",
        short_description: "Grid-connected industrial desalination",
        description: "Industrial-scale unit producing 5,000 liters per day with \
                      IoT monitoring and remote control.",
        environmental_notes: "Brine management system certified for coastal \
                              discharge; CO2 footprint offset program included.",
        product_type: ProductType::DesalinationUnit,
        price_cents: 2_499_999,
        compare_at_cents: None,
        sku: "BW-AP-IND",
        stock_quantity: 3,
        featured: false,
    },
    SeedProduct {
        name: "Environmental Data Basic",
        short_description: "Monthly access to environmental telemetry",
        description: "Basic subscription: water quality metrics and monthly \
                      reports for one connected unit.",
        environmental_notes: "",
        product_type: ProductType::DataSubscription,
        price_cents: 2_999,
        compare_at_cents: None,
        sku: "BW-DATA-BASIC",
        stock_quantity: 0,
        featured: false,
    },
    SeedProduct {
        name: "Environmental Data Professional",
        short_description: "Historical data and analytics API",
        description: "Professional subscription: historical data, raw telemetry \
                      export, and 10,000 API calls per month.",
        environmental_notes: "",
        product_type: ProductType::DataSubscription,
        price_cents: 19_999,
        compare_at_cents: None,
        sku: "BW-DATA-PRO",
        stock_quantity: 0,
        featured: true,
    },
    SeedProduct {
        name: "Environmental Data Enterprise",
        short_description: "Predictive analytics and unlimited access",
        description: "Enterprise subscription: predictive analytics, real-time \
                      alerts, custom dashboards, and unlimited API access.",
        environmental_notes: "",
        product_type: ProductType::DataSubscription,
        price_cents: 99_999,
        compare_at_cents: None,
        sku: "BW-DATA-ENT",
        stock_quantity: 0,
        featured: false,
    },
];

/// Insert the sample catalog.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is unset or database operations fail.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| "DATABASE_URL not set")?;

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let products = ProductRepository::new(&pool);

    let hardware = products
        .create_category(
            "Desalination Units",
            "Solar and hybrid powered desalination hardware",
            CategoryType::Hardware,
        )
        .await;
    let subscriptions = products
        .create_category(
            "Data Subscriptions",
            "Environmental telemetry and analytics access",
            CategoryType::Subscription,
        )
        .await;

    // Re-running the seed hits the unique name; reuse the existing rows.
    let categories = products.list_categories().await?;
    let category_id = |name: &str| categories.iter().find(|c| c.name == name).map(|c| c.id);
    if hardware.is_err() || subscriptions.is_err() {
        info!("Categories already present, reusing them");
    }

    let mut inserted = 0_usize;
    let mut skipped = 0_usize;

    for seed in SEED_PRODUCTS {
        let category = match seed.product_type {
            ProductType::DataSubscription => category_id("Data Subscriptions"),
            _ => category_id("Desalination Units"),
        };

        let new = NewProduct {
            name: seed.name.to_owned(),
            slug: None,
            description: seed.description.to_owned(),
            short_description: seed.short_description.to_owned(),
            environmental_notes: Some(seed.environmental_notes.to_owned())
                .filter(|n| !n.is_empty()),
            product_type: seed.product_type,
            category_id: category,
            price: Money::new(Decimal::new(seed.price_cents, 2), CurrencyCode::USD),
            compare_at_price: seed
                .compare_at_cents
                .map(|cents| Money::new(Decimal::new(cents, 2), CurrencyCode::USD)),
            sku: Some(seed.sku.to_owned()),
            stock_quantity: seed.stock_quantity,
            low_stock_threshold: 5,
            status: ProductStatus::Active,
            is_featured: seed.featured,
            main_image: None,
        };

        match products.create(&new).await {
            Ok(product) => {
                info!("  + {} ({})", product.name, product.slug);
                inserted += 1;
            }
            Err(db::RepositoryError::Conflict(_)) => {
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products skipped (already exist): {skipped}");

    Ok(())
}
