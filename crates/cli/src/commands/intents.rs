//! `shopbot intents`: list a tenant's enabled intents.

use std::path::Path;

use shopbot_core::RecordLookup;

use super::{CmdResult, load_config, open_records};

pub async fn run(path: Option<&Path>, business_id: i64) -> CmdResult {
    let config = load_config(path)?;
    let records = open_records(&config)?;
    let intents = records.get_enabled_intents(business_id).await?;

    if intents.is_empty() {
        println!("No enabled intents for business {business_id}; every message routes to 'others'.");
        return Ok(());
    }

    println!("Enabled intents for business {business_id}:");
    for intent in &intents {
        let template = if intent.template.is_some() { " [template]" } else { "" };
        println!("  {:<22} {}{}", intent.intent_type, intent.name, template);
    }

    Ok(())
}
