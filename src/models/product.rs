use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: Option<i64>,
    pub name: String,
    pub price: Decimal,
    pub created_at: String,
}

impl Product {
    pub fn new(name: String, price: Decimal) -> Self {
        Self {
            id: None,
            name,
            price,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (${:.2})", self.name, self.price)
    }
}

/// A product together with its associated category ids. Returned by the
/// create/update/delete paths (input-order ids) and the aggregate queries
/// (matched-set ids, deduplicated).
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithCategories {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub category_ids: Vec<i64>,
}

/// Partial update payload for a product.
///
/// `category_ids` is deliberately tri-state: `None` leaves the existing
/// associations untouched, `Some(vec![])` clears them all, and a
/// non-empty list replaces the set atomically.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category_ids: Option<Vec<i64>>,
}
