//! Context assembly strategies, one per intent category.
//!
//! Selection is a pure lookup in [`StrategyRegistry`]; anything unknown
//! lands on [`StrategyKind::Others`]. A strategy never fails outward: when
//! its lookups break it emits a one-line description of the intent instead.

mod guidance;
mod search;
mod tenant;

use std::collections::HashMap;
use std::sync::Arc;

use shopbot_core::records::FALLBACK_INTENT;
use shopbot_core::{BusinessId, CustomerId, Degradation, Message, Outcome, RecordLookup, TenantRecord};
use shopbot_retrieval::ProductSearcher;
use tracing::warn;

pub use search::extract_image_url;

/// The built-in context builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Greeting,
    StoreInfo,
    ShippingPolicy,
    TextSearch,
    ImageSearch,
    ProductUsage,
    PlaceOrder,
    HistoryInquiry,
    Others,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 9] = [
        StrategyKind::Greeting,
        StrategyKind::StoreInfo,
        StrategyKind::ShippingPolicy,
        StrategyKind::TextSearch,
        StrategyKind::ImageSearch,
        StrategyKind::ProductUsage,
        StrategyKind::PlaceOrder,
        StrategyKind::HistoryInquiry,
        StrategyKind::Others,
    ];

    /// The intent type key this strategy is registered under by default.
    pub fn intent_type(&self) -> &'static str {
        match self {
            StrategyKind::Greeting => "greetings",
            StrategyKind::StoreInfo => "store_info",
            StrategyKind::ShippingPolicy => "policy_shipping",
            StrategyKind::TextSearch => "product_search_text",
            StrategyKind::ImageSearch => "product_search_image",
            StrategyKind::ProductUsage => "product_usage",
            StrategyKind::PlaceOrder => "place_order",
            StrategyKind::HistoryInquiry => "history_inquiry",
            StrategyKind::Others => FALLBACK_INTENT,
        }
    }

    /// The single line emitted when building the full context fails.
    pub fn fallback_line(&self, message: &str) -> String {
        match self {
            StrategyKind::Greeting => "Intent: Chào hỏi khách hàng. Hãy chào hỏi một cách thân thiện.".into(),
            StrategyKind::StoreInfo => "Intent: Thông tin cửa hàng. Hãy cung cấp thông tin cửa hàng.".into(),
            StrategyKind::ShippingPolicy => {
                "Intent: Chính sách vận chuyển. Hãy giải thích về chính sách vận chuyển và đổi trả.".into()
            }
            StrategyKind::TextSearch => format!("Intent: Tìm kiếm sản phẩm. Từ khóa: '{message}'"),
            StrategyKind::ImageSearch => "Intent: Tìm kiếm sản phẩm bằng hình ảnh.".into(),
            StrategyKind::ProductUsage => {
                "Intent: Hướng dẫn sử dụng sản phẩm. Hãy cung cấp hướng dẫn chi tiết.".into()
            }
            StrategyKind::PlaceOrder => "Intent: Đặt hàng. Hãy hướng dẫn khách hàng cách đặt hàng.".into(),
            StrategyKind::HistoryInquiry => {
                "Intent: Tra cứu lịch sử đơn hàng. Hãy hướng dẫn khách hàng cách tra cứu.".into()
            }
            StrategyKind::Others => "Intent: Câu hỏi khác. Hãy trả lời một cách hữu ích và thân thiện.".into(),
        }
    }
}

/// Maps intent type keys to strategies, with a mandatory default.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    by_type: HashMap<String, StrategyKind>,
    default: StrategyKind,
}

impl StrategyRegistry {
    /// A registry holding every built-in strategy under its own key.
    pub fn new() -> Self {
        let by_type = StrategyKind::ALL
            .iter()
            .map(|k| (k.intent_type().to_string(), *k))
            .collect();
        Self {
            by_type,
            default: StrategyKind::Others,
        }
    }

    /// Route an additional intent type key to an existing strategy.
    pub fn register(&mut self, intent_type: impl Into<String>, kind: StrategyKind) {
        self.by_type.insert(intent_type.into(), kind);
    }

    pub fn resolve(&self, intent_type: &str) -> StrategyKind {
        self.by_type.get(intent_type).copied().unwrap_or(self.default)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Collaborators a strategy may consult.
#[derive(Clone)]
pub struct StrategyDeps {
    pub records: Arc<dyn RecordLookup>,
    pub searcher: Arc<ProductSearcher>,
}

/// A strategy bound to one request.
#[derive(Debug, Clone)]
pub struct ContextStrategy {
    kind: StrategyKind,
    business_id: BusinessId,
    customer_id: CustomerId,
    template: Option<String>,
}

/// Lines produced by a builder, possibly with a partial failure.
#[derive(Debug, Default)]
pub(crate) struct Draft {
    lines: Vec<String>,
    degraded: Option<Degradation>,
}

impl Draft {
    fn new(header: &str, summary: impl Into<String>) -> Self {
        Self {
            lines: vec![header.to_string(), summary.into()],
            degraded: None,
        }
    }

    fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn degrade(&mut self, reason: Degradation) {
        self.degraded.get_or_insert(reason);
    }
}

impl ContextStrategy {
    pub fn new(kind: StrategyKind, business_id: BusinessId, customer_id: CustomerId) -> Self {
        Self {
            kind,
            business_id,
            customer_id,
            template: None,
        }
    }

    /// Attach the tenant's reply template for this intent.
    pub fn with_template(mut self, template: Option<String>) -> Self {
        self.template = template.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Assemble the context text for `message`.
    pub async fn build(&self, deps: &StrategyDeps, message: &str, _history: &[Message]) -> Outcome<String> {
        let built = match self.kind {
            StrategyKind::Greeting => tenant::greeting(self, deps).await,
            StrategyKind::StoreInfo => tenant::store_info(self, deps).await,
            StrategyKind::ShippingPolicy => tenant::shipping_policy(self, deps).await,
            StrategyKind::PlaceOrder => tenant::place_order(self, deps).await,
            StrategyKind::Others => tenant::others(self, deps).await,
            StrategyKind::TextSearch => Ok(search::text_search(self, deps, message).await),
            StrategyKind::ImageSearch => Ok(search::image_search(self, deps, message).await),
            StrategyKind::ProductUsage => Ok(guidance::product_usage()),
            StrategyKind::HistoryInquiry => Ok(guidance::history_inquiry(self.customer_id)),
        };

        let (mut text, reason) = match built {
            Ok(draft) => (draft.lines.join("\n"), draft.degraded),
            Err(reason) => {
                warn!(
                    strategy = self.kind.intent_type(),
                    business_id = self.business_id,
                    reason = %reason,
                    "Context build fell back"
                );
                (self.kind.fallback_line(message), Some(reason))
            }
        };

        if let Some(template) = &self.template {
            text.push_str("\nMẫu trả lời: ");
            text.push_str(template);
        }

        match reason {
            None => Outcome::Ok(text),
            Some(reason) => Outcome::degraded(text, reason),
        }
    }

    async fn tenant(&self, deps: &StrategyDeps) -> Result<Option<TenantRecord>, Degradation> {
        deps.records
            .get_tenant(self.business_id)
            .await
            .map_err(|e| Degradation::RecordLookup(e.to_string()))
    }
}
