//! Merge/rank engine. Projects raw vector hits onto catalog entities.
//!
//! Every catalog entry is indexed as several vectors (`42_text`,
//! `42_image_main`, `42_image_3`, ...). A query, or the concatenation of one
//! query per modality, returns hits for the same entry more than once. This
//! module keeps one hit per entity (the best-scoring one), orders entities by
//! that score and truncates. It performs no I/O.

use std::collections::HashMap;

use serde_json::Value;
use shopbot_core::{RankedEntity, RetrievalHit};
use tracing::warn;

/// Metadata keys consulted when the vector id carries no numeric prefix.
const ENTITY_ID_KEYS: [&str; 2] = ["entity_id", "product_id"];

/// Resolve the catalog entity a hit belongs to.
///
/// The leading `_`-delimited token of the vector id is parsed as an integer
/// (an id without `_` is parsed whole). When that fails the hit's metadata
/// is consulted. Returns `None` when neither yields an id.
pub fn extract_entity_id(hit: &RetrievalHit) -> Option<i64> {
    let prefix = hit
        .vector_id
        .split_once('_')
        .map_or(hit.vector_id.as_str(), |(head, _)| head);

    if let Ok(id) = prefix.trim().parse::<i64>() {
        return Some(id);
    }

    ENTITY_ID_KEYS
        .iter()
        .find_map(|key| hit.raw_metadata.get(*key).and_then(metadata_id))
}

fn metadata_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Deduplicate hits by entity, rank by best score, keep the first `top_n`.
///
/// For one entity only a strictly greater score replaces the retained hit,
/// so ties keep the earliest hit. Ordering is a stable descending sort, so
/// entities with equal scores stay in first-seen order. Hits whose entity
/// cannot be resolved are dropped with a warning.
pub fn merge_and_rank(hits: &[RetrievalHit], top_n: usize) -> Vec<RankedEntity> {
    let mut ranked: Vec<RankedEntity> = Vec::new();
    let mut position: HashMap<i64, usize> = HashMap::new();

    for hit in hits {
        let Some(entity_id) = extract_entity_id(hit) else {
            warn!(vector_id = %hit.vector_id, "Dropping hit with unresolvable entity id");
            continue;
        };

        match position.get(&entity_id) {
            Some(&idx) => {
                let current = &mut ranked[idx];
                if hit.score > current.best_score {
                    current.best_score = hit.score;
                    current.modality_of_best_hit = hit.modality;
                    current.metadata = hit.raw_metadata.clone();
                }
            }
            None => {
                position.insert(entity_id, ranked.len());
                ranked.push(RankedEntity {
                    entity_id,
                    best_score: hit.score,
                    modality_of_best_hit: hit.modality,
                    metadata: hit.raw_metadata.clone(),
                });
            }
        }
    }

    ranked.sort_by(|a, b| {
        b.best_score
            .partial_cmp(&a.best_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(top_n);
    ranked
}
