//! Product search strategies backed by the vector index.

use std::sync::LazyLock;

use regex_lite::Regex;
use shopbot_core::{Degradation, RankedEntity};
use tracing::warn;

use super::{ContextStrategy, Draft, StrategyDeps};
use crate::format::format_vnd;

static URL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r#"https?://[^\s<>"']+"#).ok());

const UNNAMED: &str = "Không có tên";
const SEARCH_UNAVAILABLE: &str = "Không thể tìm kiếm sản phẩm lúc này.";
const SHORT_ANSWER: &str = "QUAN TRỌNG: Hãy trả lời NGẮN GỌN, chỉ 1-2 câu. Giới thiệu sản phẩm một cách súc tích, \
                            không dài dòng. Nếu có nhiều sản phẩm, chỉ liệt kê tên và giá ngắn gọn. ";

/// The first http(s) URL in `message`, without trailing punctuation.
pub fn extract_image_url(message: &str) -> Option<&str> {
    let pattern = URL_PATTERN.as_ref()?;
    let found = pattern.find(message)?.as_str();
    let url = found.trim_end_matches(['.', ',', ')', '!', '?', ';']);
    (!url.is_empty()).then_some(url)
}

fn result_lines(draft: &mut Draft, header: &str, entities: &[RankedEntity]) {
    draft.line(format!("\n{header}"));
    for (i, entity) in entities.iter().enumerate() {
        draft.line(format!(
            "{}. {} - Giá: {} VNĐ",
            i + 1,
            entity.name().unwrap_or(UNNAMED),
            format_vnd(entity.price().unwrap_or(0.0))
        ));
    }
}

pub(super) async fn text_search(strategy: &ContextStrategy, deps: &StrategyDeps, message: &str) -> Draft {
    let mut draft = Draft::new(
        "Intent: Tìm kiếm sản phẩm bằng text",
        format!("Khách hàng đang tìm kiếm sản phẩm với từ khóa: '{message}'"),
    );

    match deps.searcher.search_text(strategy.business_id, message).await {
        Ok(entities) if entities.is_empty() => draft.line("Không tìm thấy sản phẩm phù hợp."),
        Ok(entities) => result_lines(&mut draft, "Các sản phẩm tìm thấy:", &entities),
        Err(e) => {
            warn!(business_id = strategy.business_id, error = %e, "Text search failed");
            draft.line(SEARCH_UNAVAILABLE);
            draft.degrade(Degradation::ContextBuild(e.to_string()));
        }
    }

    draft.line(format!("{SHORT_ANSWER}Nếu không tìm thấy, chỉ cần nói ngắn gọn và hỏi từ khóa khác."));
    draft
}

pub(super) async fn image_search(strategy: &ContextStrategy, deps: &StrategyDeps, message: &str) -> Draft {
    let mut draft = Draft::new(
        "Intent: Tìm kiếm sản phẩm bằng hình ảnh",
        "Khách hàng đang tìm kiếm sản phẩm tương tự bằng cách gửi hình ảnh.",
    );

    match extract_image_url(message) {
        None => draft.line("Không tìm thấy URL hình ảnh trong tin nhắn."),
        Some(url) => match deps.searcher.search_image(strategy.business_id, url).await {
            Ok(None) => draft.line("Không thể xử lý hình ảnh được gửi."),
            Ok(Some(entities)) if entities.is_empty() => draft.line("Không tìm thấy sản phẩm tương tự."),
            Ok(Some(entities)) => result_lines(&mut draft, "Các sản phẩm tương tự tìm thấy:", &entities),
            Err(e) => {
                warn!(business_id = strategy.business_id, error = %e, "Image search failed");
                draft.line(SEARCH_UNAVAILABLE);
                draft.degrade(Degradation::ContextBuild(e.to_string()));
            }
        },
    }

    draft.line(format!("{SHORT_ANSWER}Nếu không tìm thấy, chỉ cần nói ngắn gọn và đề xuất mô tả bằng text."));
    draft
}
