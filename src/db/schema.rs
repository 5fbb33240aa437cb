pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL CHECK (name <> ''),
    parent_id  INTEGER REFERENCES categories(id),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL CHECK (name <> ''),
    price      TEXT NOT NULL CHECK (CAST(price AS REAL) >= 0.0),
    created_at TEXT NOT NULL
);

-- Association pairs carry no uniqueness constraint: duplicate
-- (product_id, category_id) rows are representable, and the counting
-- queries must collapse them.
CREATE TABLE IF NOT EXISTS product_categories (
    product_id  INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    category_id INTEGER NOT NULL REFERENCES categories(id)
);

CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);
CREATE INDEX IF NOT EXISTS idx_assoc_product ON product_categories(product_id);
CREATE INDEX IF NOT EXISTS idx_assoc_category ON product_categories(category_id);

"#;

pub(crate) const CURRENT_VERSION: i32 = 1;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[
    // Future migrations go here:
    // (1, "ALTER TABLE products ADD COLUMN sku TEXT NOT NULL DEFAULT '';"),
];
