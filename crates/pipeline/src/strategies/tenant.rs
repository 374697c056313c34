//! Strategies built from the tenant record alone.

use shopbot_core::Degradation;
use shopbot_core::records::value_text;

use super::{ContextStrategy, Draft, StrategyDeps};

pub(super) async fn greeting(strategy: &ContextStrategy, deps: &StrategyDeps) -> Result<Draft, Degradation> {
    let tenant = strategy.tenant(deps).await?;
    let mut draft = Draft::new(
        "Intent: Chào hỏi khách hàng",
        "Bạn là một chatbot bán hàng thân thiện và chuyên nghiệp.",
    );
    if let Some(tenant) = tenant {
        draft.line(format!("Tên cửa hàng: {}", tenant.name));
        if let Some(description) = &tenant.description {
            draft.line(format!("Mô tả: {description}"));
        }
    }
    draft.line(
        "Hãy chào hỏi khách hàng một cách thân thiện, giới thiệu ngắn gọn về cửa hàng \
         và hỏi xem khách hàng cần hỗ trợ gì.",
    );
    Ok(draft)
}

pub(super) async fn store_info(strategy: &ContextStrategy, deps: &StrategyDeps) -> Result<Draft, Degradation> {
    let tenant = strategy.tenant(deps).await?;
    let mut draft = Draft::new("Intent: Thông tin cửa hàng", "Khách hàng đang hỏi về thông tin cửa hàng.");
    if let Some(tenant) = tenant {
        draft.line(format!("Tên cửa hàng: {}", tenant.name));
        if let Some(phone) = &tenant.phone {
            draft.line(format!("Số điện thoại: {phone}"));
        }
        if let Some(address) = &tenant.address {
            draft.line(format!("Địa chỉ: {address}"));
        }
        if let Some(description) = &tenant.description {
            draft.line(format!("Mô tả: {description}"));
        }
        for (key, value) in &tenant.metadata {
            draft.line(format!("{key}: {}", value_text(value)));
        }
    }
    draft.line("Hãy cung cấp thông tin cửa hàng một cách đầy đủ và rõ ràng.");
    Ok(draft)
}

const POLICY_KEYS: [(&str, &str); 3] = [
    ("shipping_policy", "Chính sách vận chuyển"),
    ("return_policy", "Chính sách đổi trả"),
    ("payment_policy", "Chính sách thanh toán"),
];

pub(super) async fn shipping_policy(strategy: &ContextStrategy, deps: &StrategyDeps) -> Result<Draft, Degradation> {
    let tenant = strategy.tenant(deps).await?;
    let mut draft = Draft::new(
        "Intent: Chính sách vận chuyển và đổi trả",
        "Khách hàng đang hỏi về chính sách vận chuyển, đổi trả, hoặc các chính sách khác.",
    );
    if let Some(tenant) = tenant {
        for (key, label) in POLICY_KEYS {
            if let Some(policy) = tenant.metadata_text(key) {
                draft.line(format!("{label}: {policy}"));
            }
        }
    }
    draft.line(
        "Hãy giải thích rõ ràng về các chính sách. Nếu không có thông tin chi tiết, \
         hãy nói rõ và đề xuất khách hàng liên hệ trực tiếp.",
    );
    Ok(draft)
}

pub(super) async fn place_order(strategy: &ContextStrategy, deps: &StrategyDeps) -> Result<Draft, Degradation> {
    let tenant = strategy.tenant(deps).await?;
    let mut draft = Draft::new("Intent: Đặt hàng", "Khách hàng muốn đặt hàng sản phẩm.");
    if let Some(tenant) = tenant {
        if let Some(phone) = &tenant.phone {
            draft.line(format!("Số điện thoại đặt hàng: {phone}"));
        }
        if let Some(address) = &tenant.address {
            draft.line(format!("Địa chỉ: {address}"));
        }
    }
    draft.line(
        "Hãy hướng dẫn khách hàng cách đặt hàng: qua website, điện thoại, hoặc trực tiếp tại cửa hàng. \
         Thu thập đủ 5 thông tin: Tên, ID sản phẩm, Số lượng, Địa chỉ, Số điện thoại.",
    );
    Ok(draft)
}

pub(super) async fn others(strategy: &ContextStrategy, deps: &StrategyDeps) -> Result<Draft, Degradation> {
    let tenant = strategy.tenant(deps).await?;
    let mut draft = Draft::new(
        "Intent: Câu hỏi khác",
        "Khách hàng đang hỏi về vấn đề không thuộc các intent đã định nghĩa.",
    );
    if let Some(tenant) = tenant {
        draft.line(format!("Tên cửa hàng: {}", tenant.name));
        if let Some(phone) = &tenant.phone {
            draft.line(format!("Số điện thoại hỗ trợ: {phone}"));
        }
    }
    draft.line(
        "Hãy trả lời một cách hữu ích và thân thiện. Nếu không thể trả lời, \
         hãy đề xuất khách hàng liên hệ trực tiếp qua điện thoại hoặc email để được hỗ trợ tốt hơn.",
    );
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::super::StrategyKind;
    use super::*;
    use crate::test_helpers::*;
    use serde_json::json;
    use std::sync::Arc;

    async fn build(kind: StrategyKind, records: CountingRecords) -> String {
        let deps = StrategyDeps {
            records: Arc::new(records),
            searcher: seeded_searcher(false).await,
        };
        ContextStrategy::new(kind, 1, 7)
            .build(&deps, "câu hỏi", &[])
            .await
            .into_value()
    }

    #[tokio::test]
    async fn store_info_lists_contact_and_metadata() {
        let text = build(StrategyKind::StoreInfo, CountingRecords::sample()).await;
        assert!(text.contains("Số điện thoại: 0901234567"));
        assert!(text.contains("Địa chỉ: 12 Lê Lợi, Quận 1"));
        assert!(text.contains("return_policy: Đổi trả trong 7 ngày"));
    }

    #[tokio::test]
    async fn policy_reads_known_keys_only() {
        let mut records = CountingRecords::sample();
        if let Some(t) = records.tenant.as_mut() {
            t.metadata.insert("payment_policy".into(), json!("COD toàn quốc"));
            t.metadata.insert("opening_hours".into(), json!("8h-22h"));
        }
        let text = build(StrategyKind::ShippingPolicy, records).await;

        assert!(text.contains("Chính sách vận chuyển: Miễn phí ship đơn từ 500k"));
        assert!(text.contains("Chính sách đổi trả: Đổi trả trong 7 ngày"));
        assert!(text.contains("Chính sách thanh toán: COD toàn quốc"));
        assert!(!text.contains("8h-22h"));
    }

    #[tokio::test]
    async fn missing_tenant_still_gives_directive() {
        let records = CountingRecords {
            tenant: None,
            ..CountingRecords::sample()
        };
        let text = build(StrategyKind::PlaceOrder, records).await;
        assert!(text.starts_with("Intent: Đặt hàng\nKhách hàng muốn đặt hàng sản phẩm.\n"));
        assert!(!text.contains("Số điện thoại đặt hàng"));
        assert!(text.contains("ID sản phẩm"));
    }

    #[tokio::test]
    async fn others_names_support_phone() {
        let text = build(StrategyKind::Others, CountingRecords::sample()).await;
        assert!(text.contains("Số điện thoại hỗ trợ: 0901234567"));
    }
}
