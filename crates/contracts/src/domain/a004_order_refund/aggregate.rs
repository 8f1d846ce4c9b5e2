use crate::domain::common::{AggregateId, AggregateRoot, BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Type
// ============================================================================

/// Уникальный идентификатор записи возврата
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderRefundId(pub Uuid);

impl OrderRefundId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }

    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl AggregateId for OrderRefundId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(OrderRefundId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Запись возврата по заказу магазина. Уникальна по (brand_id, order_id).
///
/// Пишется только реконсилиатором возвратов; сумма перезаписывается
/// последним вычислением, не накапливается.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRefund {
    #[serde(flatten)]
    pub base: BaseAggregate<OrderRefundId>,

    pub brand_id: String,

    /// Внешний ID заказа на платформе магазина
    pub order_id: String,

    /// Момент создания исходного заказа
    pub order_created_at: chrono::DateTime<chrono::Utc>,

    /// Суммарная величина возврата по заказу
    pub amount: f64,

    /// Количество возвратов на заказе
    pub refund_count: i32,
}

impl OrderRefund {
    /// Создать новую запись для вставки в БД
    pub fn new_for_insert(
        brand_id: String,
        order_id: String,
        order_created_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let code = format!("RF-{}", order_id);
        let description = format!("Возврат по заказу {}", order_id);
        let base = BaseAggregate::new(OrderRefundId::new_v4(), code, description);

        Self {
            base,
            brand_id,
            order_id,
            order_created_at,
            amount: 0.0,
            refund_count: 0,
        }
    }

    /// Хук перед записью
    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for OrderRefund {
    type Id = OrderRefundId;

    fn id(&self) -> Self::Id {
        self.base.id
    }

    fn code(&self) -> &str {
        &self.base.code
    }

    fn description(&self) -> &str {
        &self.base.description
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.base.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.base.metadata
    }

    fn aggregate_index() -> &'static str {
        "a004"
    }

    fn collection_name() -> &'static str {
        "order_refund"
    }
}
