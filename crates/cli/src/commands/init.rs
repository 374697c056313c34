//! `shopbot init`: write a default config file.

use std::path::Path;

use shopbot_config::AppConfig;

use super::{CmdResult, config_path};

pub async fn run(path: Option<&Path>, force: bool) -> CmdResult {
    let config_path = config_path(path);

    if config_path.exists() && !force {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.");
        return Ok(());
    }

    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config at: {}", config_path.display());
    println!();
    println!("📝 Next steps:");
    println!("   1. Set GEMINI_API_KEY, OPENAI_API_KEY, PINECONE_API_KEY and PINECONE_HOST");
    println!("   2. Put tenants, catalog and intents in {}", AppConfig::default().records.path.display());
    println!("   3. Run: shopbot doctor");

    Ok(())
}
