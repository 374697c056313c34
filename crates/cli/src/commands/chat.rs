//! `shopbot chat`: answer one message, printing `{response, intent, confidence}`.

use std::path::Path;

use super::{CmdResult, build_pipeline, load_config, read_history};

pub async fn run(
    path: Option<&Path>,
    business_id: i64,
    customer_id: i64,
    history: Option<&Path>,
    message: &str,
) -> CmdResult {
    if message.trim().is_empty() {
        return Err("Message must not be empty".into());
    }
    let config = load_config(path)?;
    let history = read_history(history)?;
    let pipeline = build_pipeline(&config)?;

    let reply = pipeline.process_chat(message, &history, customer_id, business_id).await;
    for reason in &reply.degradations {
        tracing::debug!(%reason, "Fallback taken");
    }
    println!("{}", serde_json::to_string_pretty(&reply)?);

    Ok(())
}
