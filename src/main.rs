use itemdb::config::AppConfig;
use itemdb::seed;
use itemdb::store::{PostgresStore, SchemaCatalogStore};
use itemdb::SchemaRegistry;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .init();

    println!("itemdb: schema-driven entity storage");

    // Load configuration
    let config = AppConfig::load()?;

    println!("Connecting to PostgreSQL...");
    let database_url = config.database_url()?;
    let store = PostgresStore::new(&database_url).await?;

    println!("Running database migrations...");
    store.migrate().await?;
    println!("Database ready");

    let store = Arc::new(store);
    let registry = Arc::new(SchemaRegistry::new());

    // Load demo schemas for demonstration (optional)
    if std::env::var("LOAD_DEMO_SCHEMAS").unwrap_or_default() == "true" {
        println!("Registering demo schemas...");
        seed::register_demo_schemas(&registry)?;
        for schema in registry.schemas() {
            store.save_schema(&schema).await?;
        }
        println!("Registered {} demo schemas", registry.len());
    }

    let persisted = store.list_schemas().await?;
    for schema in &persisted {
        registry.register(schema.clone())?;
    }
    registry.rebuild();
    log::info!(
        "registry ready: {} schemas, {} relationship entries",
        registry.len(),
        registry.relationship_count()
    );

    Ok(())
}
