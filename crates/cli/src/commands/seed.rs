//! Demo catalog seeding.

use secrecy::SecretString;
use tracing::info;

use copperleaf_storefront::db::{self, PgStore, ProductStore};
use copperleaf_storefront::models::NewProduct;

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    price: &'static str,
    image: &'static str,
}

const CATALOG: &[SeedProduct] = &[
    SeedProduct {
        name: "Wireless Headphones",
        description: "High-quality noise-canceling wireless headphones with up to 20 hours of battery life.",
        category: "electronics",
        price: "149.99",
        image: "https://images.pexels.com/photos/459225/pexels-photo-459225.jpeg",
    },
    SeedProduct {
        name: "Leather Jacket",
        description: "Stylish and comfortable leather jacket for all seasons. Available in various sizes.",
        category: "fashion",
        price: "199.99",
        image: "https://images.pexels.com/photos/1533587/pexels-photo-1533587.jpeg",
    },
    SeedProduct {
        name: "Smartphone",
        description: "Latest smartphone with 6.5-inch screen, 128GB storage, and fast charging.",
        category: "electronics",
        price: "699.99",
        image: "https://images.pexels.com/photos/1851471/pexels-photo-1851471.jpeg",
    },
    SeedProduct {
        name: "Yoga Mat",
        description: "Eco-friendly and non-slip yoga mat, perfect for home or gym workouts.",
        category: "sports",
        price: "25.99",
        image: "https://images.pexels.com/photos/2554794/pexels-photo-2554794.jpeg",
    },
    SeedProduct {
        name: "LED Desk Lamp",
        description: "Energy-efficient LED desk lamp with adjustable brightness and color temperature.",
        category: "home",
        price: "39.99",
        image: "https://images.pexels.com/photos/3721227/pexels-photo-3721227.jpeg",
    },
    SeedProduct {
        name: "Smartwatch",
        description: "Fitness tracker and smartwatch with heart rate monitor, step counter, and sleep tracker.",
        category: "electronics",
        price: "129.99",
        image: "https://images.pexels.com/photos/1610790/pexels-photo-1610790.jpeg",
    },
    SeedProduct {
        name: "Running Shoes",
        description: "Comfortable running shoes with durable sole and breathable material.",
        category: "fashion",
        price: "89.99",
        image: "https://images.pexels.com/photos/1059836/pexels-photo-1059836.jpeg",
    },
    SeedProduct {
        name: "Blender",
        description: "Powerful blender with multiple speed settings and a large capacity for smoothies and soups.",
        category: "home",
        price: "49.99",
        image: "https://images.pexels.com/photos/3341225/pexels-photo-3341225.jpeg",
    },
];

/// Insert the demo catalog.
///
/// Skips seeding when the catalog already has products, so re-runs are
/// harmless.
///
/// # Errors
///
/// Returns an error if the environment variable is missing or any insert
/// fails.
pub async fn catalog(stock: i32) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "STOREFRONT_DATABASE_URL not set")?;

    let pool = db::create_pool(&database_url).await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storefront.product")
        .fetch_one(&pool)
        .await?;
    if existing > 0 {
        info!(existing, "Catalog already seeded, nothing to do");
        return Ok(());
    }

    let store = PgStore::new(pool);

    for seed in CATALOG {
        let product = store
            .create_product(NewProduct {
                name: seed.name.to_owned(),
                description: seed.description.to_owned(),
                category: seed.category.to_owned(),
                price: seed.price.parse()?,
                stock,
                images: vec![seed.image.to_owned()],
                image_url: None,
            })
            .await?;
        info!(id = %product.id, name = %product.name, "Seeded product");
    }

    info!(count = CATALOG.len(), "Catalog seeding complete");
    Ok(())
}
