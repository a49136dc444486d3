//! # Item Holder Demo
//!
//! Boots a small service graph and shuts it down again:
//!
//! ```text
//! config ──► database ──► http
//!    │                     ▲
//!    └──► request_id ──────┘   (per consumer)
//! ```
//!
//! `config` and `database` are declared as JSON and turned into real definitions by adapters;
//! `http` is a plain definition. Run with `RUST_LOG=info cargo run` (or `debug` for more).

use item_holder::tracing::setup_tracing;
use item_holder::{
    BoxError, CustomDefinition, Definition, Holder, ItemDefinition, ItemPack,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const DEFINITIONS: &str = r#"[
    { "type": "config", "name": "config", "listen": "127.0.0.1:8080", "pool_size": 4 },
    { "type": "database", "name": "database", "need": "config" }
]"#;

#[derive(Debug, Deserialize)]
struct Config {
    listen: String,
    pool_size: u32,
}

#[derive(Debug)]
struct Database {
    pool_size: u32,
    open: AtomicBool,
}

#[derive(Debug)]
struct HttpServer {
    listen: String,
    accepting: Arc<AtomicBool>,
}

fn config_adapter(custom: CustomDefinition) -> Result<ItemDefinition, BoxError> {
    let config: Arc<Config> = Arc::new(custom.params()?);
    Ok(custom.into_standard(move |_| {
        let config = config.clone();
        async move { Ok(ItemPack::from_item(config).into()) }
    }))
}

fn database_adapter(custom: CustomDefinition) -> Result<ItemDefinition, BoxError> {
    Ok(custom.into_standard(|ctx| async move {
        let config = ctx.require::<Config>("config")?;
        // stands in for opening a connection pool
        tokio::time::sleep(Duration::from_millis(20)).await;
        let database = Arc::new(Database {
            pool_size: config.pool_size,
            open: AtomicBool::new(true),
        });
        let handle = database.clone();
        Ok(ItemPack::from_item(database)
            .with_destroy(move || async move {
                handle.open.store(false, Ordering::SeqCst);
                info!(pool_size = handle.pool_size, "database pool released");
                Ok(())
            })
            .into())
    }))
}

fn request_ids() -> ItemDefinition {
    ItemDefinition::new("request_id", |ctx| async move {
        let prefix = ctx.consumer().unwrap_or("anon").to_string();
        let counter = AtomicU64::new(0);
        let next = move || format!("{prefix}-{}", counter.fetch_add(1, Ordering::SeqCst));
        Ok(ItemPack::new(Box::new(next) as Box<dyn Fn() -> String + Send + Sync>).into())
    })
}

fn http_server() -> ItemDefinition {
    ItemDefinition::new("http", |ctx| async move {
        let config = ctx.require::<Config>("config")?;
        let database = ctx.require::<Database>("database")?;
        let next_id = ctx.require::<Box<dyn Fn() -> String + Send + Sync>>("request_id")?;
        info!(listen = %config.listen, first_request = %next_id(), db_open = database.open.load(Ordering::SeqCst), "http listener ready");

        let accepting = Arc::new(AtomicBool::new(true));
        let stop_flag = accepting.clone();
        Ok(ItemPack::new(HttpServer {
            listen: config.listen.clone(),
            accepting,
        })
        .with_stop(move || async move {
            stop_flag.store(false, Ordering::SeqCst);
            Ok(())
        })
        .into())
    })
    .needs(["config", "database", "request_id"])
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    setup_tracing();

    let holder = Holder::builder()
        .adapter("config", config_adapter)
        .adapter("database", database_adapter)
        .build();

    let custom: Vec<CustomDefinition> = serde_json::from_str(DEFINITIONS)?;
    let mut definitions: Vec<Definition> = custom.into_iter().map(Definition::from).collect();
    definitions.push(Definition::per_consumer(request_ids()));
    definitions.push(http_server().into());

    holder.load(definitions).await?;

    if let Some(server) = holder.get::<HttpServer>("http")? {
        info!(listen = %server.listen, accepting = server.accepting.load(Ordering::SeqCst), "serving");
    }

    holder.close().await?;
    info!(state = %holder.state(), "done");
    Ok(())
}
