//! Strategies that only steer the reply; they read no records.

use shopbot_core::CustomerId;

use super::Draft;

pub(super) fn product_usage() -> Draft {
    let mut draft = Draft::new(
        "Intent: Hướng dẫn sử dụng sản phẩm",
        "Khách hàng đang hỏi về cách sử dụng, bảo quản, hoặc thông tin chi tiết về sản phẩm.",
    );
    draft.line(
        "Hãy cung cấp hướng dẫn sử dụng chi tiết, cách bảo quản, và các lưu ý quan trọng. \
         Nếu không có thông tin cụ thể, hãy đề xuất khách hàng xem thông tin trên website \
         hoặc liên hệ trực tiếp để được tư vấn.",
    );
    draft
}

pub(super) fn history_inquiry(customer_id: CustomerId) -> Draft {
    let mut draft = Draft::new(
        "Intent: Tra cứu lịch sử đơn hàng",
        format!("Khách hàng (ID: {customer_id}) đang hỏi về lịch sử đơn hàng."),
    );
    draft.line(
        "Hãy hỏi khách hàng về thông tin cần tra cứu: số điện thoại, mã đơn hàng, \
         hoặc thời gian đặt hàng. Sau đó hướng dẫn cách tra cứu trên website hoặc \
         liên hệ bộ phận chăm sóc khách hàng.",
    );
    draft
}
