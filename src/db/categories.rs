use rusqlite::{params, Connection};

use super::Database;
use crate::error::{CatalogError, CatalogResult, Entity};
use crate::models::{Category, CategoryPatch, CategoryProductCount, ParentPatch};

fn lookup_category(conn: &Connection, id: i64) -> CatalogResult<Category> {
    let result = conn.query_row(
        "SELECT id, name, parent_id, created_at FROM categories WHERE id = ?1",
        params![id],
        |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                parent_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    );
    match result {
        Ok(c) => Ok(c),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(CatalogError::not_found(Entity::Category, id))
        }
        Err(e) => Err(e.into()),
    }
}

impl Database {
    pub(crate) fn get_category(&self, id: i64) -> CatalogResult<Category> {
        lookup_category(&self.conn, id)
    }

    pub(crate) fn get_categories(&self) -> CatalogResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, parent_id, created_at FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                parent_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn create_category(
        &self,
        name: &str,
        parent_id: Option<i64>,
    ) -> CatalogResult<Category> {
        if name.is_empty() {
            return Err(CatalogError::ConstraintViolation(
                "category name must not be empty".into(),
            ));
        }
        let category = Category::new(name.to_string(), parent_id);
        self.conn
            .execute(
                "INSERT INTO categories (name, parent_id, created_at) VALUES (?1, ?2, ?3)",
                params![category.name, category.parent_id, category.created_at],
            )
            .map_err(|e| CatalogError::constraint(e, "parent category does not exist"))?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, name, "created category");
        Ok(Category {
            id: Some(id),
            ..category
        })
    }

    /// Partial update: only the fields carried by the patch change.
    /// `ParentPatch::Clear` detaches the category to root, which is
    /// distinct from leaving the parent alone.
    pub(crate) fn update_category(
        &mut self,
        id: i64,
        patch: &CategoryPatch,
    ) -> CatalogResult<Category> {
        let tx = self.conn.transaction()?;
        let current = lookup_category(&tx, id)?;

        let name = patch.name.clone().unwrap_or(current.name);
        if name.is_empty() {
            return Err(CatalogError::ConstraintViolation(
                "category name must not be empty".into(),
            ));
        }
        let parent_id = match patch.parent {
            ParentPatch::Keep => current.parent_id,
            ParentPatch::Clear => None,
            ParentPatch::Set(p) => Some(p),
        };

        tx.execute(
            "UPDATE categories SET name = ?1, parent_id = ?2 WHERE id = ?3",
            params![name, parent_id, id],
        )
        .map_err(|e| CatalogError::constraint(e, "parent category does not exist"))?;
        tx.commit()?;

        Ok(Category {
            id: Some(id),
            name,
            parent_id,
            created_at: current.created_at,
        })
    }

    /// Restricted delete: fails with `ConstraintViolation` while child
    /// categories or product associations still reference the row.
    pub(crate) fn delete_category(&mut self, id: i64) -> CatalogResult<Category> {
        let tx = self.conn.transaction()?;
        let current = lookup_category(&tx, id)?;
        tx.execute("DELETE FROM categories WHERE id = ?1", params![id])
            .map_err(|e| {
                CatalogError::constraint(
                    e,
                    "category is still referenced by child categories or products",
                )
            })?;
        tx.commit()?;
        tracing::debug!(id, "deleted category");
        Ok(current)
    }

    /// Distinct categories associated with any of the given products.
    /// Every product id is checked for existence first; the result-set
    /// size says nothing about which products exist.
    pub(crate) fn categories_for_products(
        &self,
        product_ids: &[i64],
    ) -> CatalogResult<Vec<Category>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let existing = super::existing_ids(&self.conn, "products", product_ids)?;
        let missing = super::missing_ids(product_ids, &existing);
        if !missing.is_empty() {
            return Err(CatalogError::ValidationFailed {
                entity: Entity::Product,
                missing,
            });
        }

        let sql = format!(
            "SELECT DISTINCT c.id, c.name, c.parent_id, c.created_at
             FROM categories c
             JOIN product_categories pc ON pc.category_id = c.id
             WHERE pc.product_id IN ({})
             ORDER BY c.id",
            super::placeholders(1, product_ids.len())
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        for id in product_ids {
            params.push(Box::new(*id));
        }
        let refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(refs.as_slice(), |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                parent_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Distinct product count per requested category, 0 for categories
    /// with no associations. Duplicate association rows collapse. Fails
    /// with `ValidationFailed` if any requested id has no category row.
    pub(crate) fn categories_with_product_count(
        &self,
        category_ids: &[i64],
    ) -> CatalogResult<Vec<CategoryProductCount>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT c.id, c.name, COUNT(DISTINCT pc.product_id)
             FROM categories c
             LEFT JOIN product_categories pc ON pc.category_id = c.id
             WHERE c.id IN ({})
             GROUP BY c.id, c.name
             ORDER BY c.id",
            super::placeholders(1, category_ids.len())
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        for id in category_ids {
            params.push(Box::new(*id));
        }
        let refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(refs.as_slice(), |row| {
            Ok(CategoryProductCount {
                category_id: row.get(0)?,
                category_name: row.get(1)?,
                product_count: row.get(2)?,
            })
        })?;
        let counts = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        let found: std::collections::HashSet<i64> =
            counts.iter().map(|c| c.category_id).collect();
        let missing = super::missing_ids(category_ids, &found);
        if !missing.is_empty() {
            return Err(CatalogError::ValidationFailed {
                entity: Entity::Category,
                missing,
            });
        }
        Ok(counts)
    }
}
