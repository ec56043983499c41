use crate::models::{
    Order, OrderLine, OrderSummary, Product, ShippingAddress, SummaryAddress, SummaryProduct,
    SummaryUser, TagChoice, TagSelection, User,
};

/// One order line with the product it refers to and its tags.
pub struct SummaryLine<'a> {
    pub line: &'a OrderLine,
    pub product: &'a Product,
    pub tags: &'a [TagSelection],
}

pub fn build_summary(
    order: &Order,
    user: &User,
    address: &ShippingAddress,
    lines: &[SummaryLine<'_>],
    image_url: &str,
    web_url: &str,
) -> OrderSummary {
    let products = lines
        .iter()
        .map(|entry| SummaryProduct {
            product_id: entry.product.id,
            product_name: entry.product.product_name.clone(),
            price: entry.product.price,
            amount: entry.line.amount,
            is_digital: entry.product.is_digital,
            thumbnail: entry.product.thumbnail.clone(),
            thumbnail_url: format!(
                "{}{}",
                image_url,
                entry.product.thumbnail.as_deref().unwrap_or_default()
            ),
            certificate_color: entry.line.certificate_color.clone(),
            frame_color: entry.line.frame_color.clone(),
            frame_size: entry.line.frame_size.clone(),
            frame_thickness: entry.line.frame_thickness.clone(),
            tags: entry
                .tags
                .iter()
                .map(|tag| TagChoice {
                    name: tag.tag_name.clone(),
                    data: tag.tag_data.clone(),
                })
                .collect(),
        })
        .collect();

    OrderSummary {
        order_id: order.id,
        txn_id: order.txn_id.clone(),
        user: SummaryUser {
            id: user.id,
            username: user.username.clone(),
            phone: user.phone.clone(),
            email: user.email.clone(),
        },
        shipping_address: SummaryAddress::from(address),
        products,
        sub_total: order.sub_total,
        c_gst: order.c_gst,
        s_gst: order.s_gst,
        total_amount: order.total_amount,
        amount: order.total_amount - order.shipping_fee,
        shipping_fee: order.shipping_fee,
        paid_amount: order.paid_amount,
        tracking_url: format!("{}{}", web_url, order.txn_id),
    }
}
