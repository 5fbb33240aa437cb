use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: Option<i64>,
    pub name: String,
    pub parent_id: Option<i64>,
    pub created_at: String,
}

impl Category {
    pub fn new(name: String, parent_id: Option<i64>) -> Self {
        Self {
            id: None,
            name,
            parent_id,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Per-category distinct product count, as reported by
/// `categories_with_product_count`.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryProductCount {
    pub category_id: i64,
    pub category_name: String,
    pub product_count: i64,
}

/// Tri-state parent change for a category update: leave the parent
/// alone, detach to root, or re-parent under another category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParentPatch {
    #[default]
    Keep,
    Clear,
    Set(i64),
}

/// Partial update payload for a category. `None` keeps the current name.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub parent: ParentPatch,
}
