//! `shopbot doctor`: diagnose configuration and credentials.

use std::path::Path;

use shopbot_config::{AppConfig, ConfigError};
use shopbot_store::RecordStore;

use super::{CmdResult, config_path};

pub async fn run(path: Option<&Path>) -> CmdResult {
    println!("🩺 Shopbot Doctor");
    println!("================\n");

    let mut issues = 0;
    let config_path = config_path(path);
    if !config_path.exists() {
        println!("  ⚠️  No config file at {}, using defaults", config_path.display());
        issues += 1;
    }

    let config = match AppConfig::load_from(&config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running other checks.");
            return Ok(());
        }
    };

    println!("  Generator:    {} ({})", config.generator.provider, config.generator.model);
    println!("  Embedding:    {} ({}, dim {})", config.embedding.provider, config.embedding.model, config.embedding.dimension);
    println!("  Vector index: {}", config.vector_index.backend);

    match config.require_credentials() {
        Ok(()) => println!("  ✅ Credentials present"),
        Err(ConfigError::MissingCredentials(missing)) => {
            for item in &missing {
                println!("  ❌ Missing: {item}");
            }
            issues += missing.len();
        }
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    match RecordStore::open(&config.records.path) {
        Ok(store) => {
            let records = store.snapshot().await;
            println!(
                "  ✅ Records: {} tenant(s), {} catalog entries, {} intent(s)",
                records.tenants.len(),
                records.catalog.len(),
                records.intents.len()
            );
            if records.tenants.is_empty() {
                println!("  ⚠️  No tenants in {}", config.records.path.display());
                issues += 1;
            }
        }
        Err(e) => {
            println!("  ❌ Records unreadable: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
