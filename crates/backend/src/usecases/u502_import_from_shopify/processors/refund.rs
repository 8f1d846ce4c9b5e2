use anyhow::Result;

use crate::domain::a004_order_refund;

use super::normalize::NormalizedOrder;

/// Зафиксировать возврат заказа во внешнем реестре возвратов.
///
/// Запись создается идемпотентно по (brand_id, order_id); сумма и
/// количество перезаписываются последним вычислением, поэтому
/// повторные прогоны сходятся, а не накапливают. Нулевой возврат
/// и пустой brand_id — no-op.
pub async fn reconcile(brand_id: &str, order: &NormalizedOrder) -> Result<()> {
    if brand_id.trim().is_empty() {
        return Ok(());
    }
    if order.refund_amount <= 0.0 {
        return Ok(());
    }

    a004_order_refund::repository::ensure_exists(brand_id, &order.order_id, order.created_at)
        .await?;
    a004_order_refund::repository::update_amount(
        brand_id,
        &order.order_id,
        order.refund_amount,
        order.refund_count as i32,
    )
    .await?;

    tracing::debug!(
        "Refund recorded: brand={} order={} amount={:.2} count={}",
        brand_id,
        order.order_id,
        order.refund_amount,
        order.refund_count
    );
    Ok(())
}
