//! `shopbot ask`: instruction-and-context mode, no intent routing.

use std::path::Path;

use super::{CmdResult, build_pipeline, load_config, read_history};

pub async fn run(
    path: Option<&Path>,
    business_id: i64,
    instruction: Option<&str>,
    history: Option<&Path>,
    use_cache: bool,
    message: &str,
) -> CmdResult {
    if message.trim().is_empty() {
        return Err("Message must not be empty".into());
    }
    let config = load_config(path)?;
    let history = read_history(history)?;
    let pipeline = build_pipeline(&config)?;

    let reply = pipeline
        .chat_with_instruction(message, &history, business_id, instruction, use_cache)
        .await;
    if let Some(reason) = reply.reason() {
        tracing::debug!(%reason, "Fallback taken");
    }
    println!("{}", reply.value());

    Ok(())
}
