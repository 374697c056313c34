//! `shopbot context`: print a tenant's static context.

use std::path::Path;
use std::time::Duration;

use shopbot_pipeline::TenantContextCache;

use super::{CmdResult, load_config, open_records};

pub async fn run(path: Option<&Path>, business_id: i64, use_cache: bool) -> CmdResult {
    let config = load_config(path)?;
    let records = open_records(&config)?;
    let cache = TenantContextCache::new();

    let ttl = if use_cache {
        Duration::from_secs(config.pipeline.context_cache_ttl_secs)
    } else {
        Duration::ZERO
    };
    let outcome = cache.get(business_id, ttl, records.as_ref()).await;

    if let Some(reason) = outcome.reason() {
        eprintln!("⚠️  Partial context: {reason}");
    }
    println!("{}", outcome.value());

    Ok(())
}
