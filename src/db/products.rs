use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::Database;
use crate::error::{CatalogError, CatalogResult, Entity};
use crate::models::{Product, ProductPatch, ProductWithCategories};

fn lookup_product(conn: &Connection, id: i64) -> CatalogResult<Product> {
    let result = conn.query_row(
        "SELECT id, name, price, created_at FROM products WHERE id = ?1",
        params![id],
        |row| {
            let price_str: String = row.get(2)?;
            Ok(Product {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                price: Decimal::from_str(&price_str).unwrap_or_default(),
                created_at: row.get(3)?,
            })
        },
    );
    match result {
        Ok(p) => Ok(p),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(CatalogError::not_found(Entity::Product, id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Association rows for one product, in insertion order. Not
/// deduplicated: the schema permits duplicate pairs.
fn category_ids_for(conn: &Connection, product_id: i64) -> CatalogResult<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT category_id FROM product_categories WHERE product_id = ?1 ORDER BY rowid")?;
    let rows = stmt.query_map(params![product_id], |row| row.get(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn check_fields(name: &str, price: Decimal) -> CatalogResult<()> {
    if name.is_empty() {
        return Err(CatalogError::ConstraintViolation(
            "product name must not be empty".into(),
        ));
    }
    if price < Decimal::ZERO {
        return Err(CatalogError::ConstraintViolation(
            "product price must not be negative".into(),
        ));
    }
    Ok(())
}

impl Database {
    pub(crate) fn get_product(&self, id: i64) -> CatalogResult<Product> {
        lookup_product(&self.conn, id)
    }

    pub(crate) fn get_product_category_ids(&self, product_id: i64) -> CatalogResult<Vec<i64>> {
        category_ids_for(&self.conn, product_id)
    }

    /// Inserts the product row and one association row per category id,
    /// in input order without dedup, all inside one transaction. A bad
    /// category id fails the whole operation.
    pub(crate) fn create_product(
        &mut self,
        name: &str,
        price: Decimal,
        category_ids: &[i64],
    ) -> CatalogResult<ProductWithCategories> {
        check_fields(name, price)?;
        let product = Product::new(name.to_string(), price);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO products (name, price, created_at) VALUES (?1, ?2, ?3)",
            params![product.name, product.price.to_string(), product.created_at],
        )?;
        let id = tx.last_insert_rowid();
        for cat_id in category_ids {
            tx.execute(
                "INSERT INTO product_categories (product_id, category_id) VALUES (?1, ?2)",
                params![id, cat_id],
            )
            .map_err(|e| CatalogError::constraint(e, "one or more categories does not exist"))?;
        }
        tx.commit()?;
        tracing::debug!(id, name, "created product");

        Ok(ProductWithCategories {
            id,
            name: product.name,
            price: product.price,
            category_ids: category_ids.to_vec(),
        })
    }

    /// Partial update. `patch.category_ids` is tri-state: `None` leaves
    /// the association set untouched, `Some` replaces it wholesale
    /// (delete-all then insert) in the same transaction as the row
    /// update, so a bad category id leaves the prior set intact.
    pub(crate) fn update_product(
        &mut self,
        id: i64,
        patch: &ProductPatch,
    ) -> CatalogResult<ProductWithCategories> {
        let tx = self.conn.transaction()?;
        let current = lookup_product(&tx, id)?;

        let name = patch.name.clone().unwrap_or(current.name);
        let price = patch.price.unwrap_or(current.price);
        check_fields(&name, price)?;

        tx.execute(
            "UPDATE products SET name = ?1, price = ?2 WHERE id = ?3",
            params![name, price.to_string(), id],
        )?;

        let category_ids = match &patch.category_ids {
            Some(ids) => {
                tx.execute(
                    "DELETE FROM product_categories WHERE product_id = ?1",
                    params![id],
                )?;
                for cat_id in ids {
                    tx.execute(
                        "INSERT INTO product_categories (product_id, category_id) VALUES (?1, ?2)",
                        params![id, cat_id],
                    )
                    .map_err(|e| {
                        CatalogError::constraint(e, "one or more categories does not exist")
                    })?;
                }
                ids.clone()
            }
            None => category_ids_for(&tx, id)?,
        };
        tx.commit()?;

        Ok(ProductWithCategories {
            id,
            name,
            price,
            category_ids,
        })
    }

    /// Deletes the product, returning its last values plus the category
    /// ids it was associated with. Association rows cascade.
    pub(crate) fn delete_product(&mut self, id: i64) -> CatalogResult<ProductWithCategories> {
        let tx = self.conn.transaction()?;
        let current = lookup_product(&tx, id)?;
        let category_ids = category_ids_for(&tx, id)?;
        tx.execute("DELETE FROM products WHERE id = ?1", params![id])?;
        tx.commit()?;
        tracing::debug!(id, "deleted product");

        Ok(ProductWithCategories {
            id,
            name: current.name,
            price: current.price,
            category_ids,
        })
    }

    /// Products associated with the category or any of its direct
    /// children (one level down, never grandchildren), grouped by
    /// product with the matched category-id set. An existing category
    /// with no products yields an empty list, not an error.
    pub(crate) fn products_by_category_tree(
        &self,
        category_id: i64,
    ) -> CatalogResult<Vec<ProductWithCategories>> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
            params![category_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(CatalogError::not_found(Entity::Category, category_id));
        }

        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.name, p.price, c.id
             FROM products p
             JOIN product_categories pc ON pc.product_id = p.id
             JOIN categories c ON c.id = pc.category_id
             WHERE c.id = ?1 OR c.parent_id = ?1
             ORDER BY p.id, c.id",
        )?;
        let rows = stmt.query_map(params![category_id], |row| {
            let price_str: String = row.get(2)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                Decimal::from_str(&price_str).unwrap_or_default(),
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut products: Vec<ProductWithCategories> = Vec::new();
        for row in rows {
            let (id, name, price, cat_id) = row?;
            match products.last_mut() {
                Some(last) if last.id == id => {
                    if !last.category_ids.contains(&cat_id) {
                        last.category_ids.push(cat_id);
                    }
                }
                _ => products.push(ProductWithCategories {
                    id,
                    name,
                    price,
                    category_ids: vec![cat_id],
                }),
            }
        }
        Ok(products)
    }

    /// Count of distinct products associated with any of the given
    /// categories. A product in several of them counts once, and there
    /// is no child expansion here. Every id must name an existing
    /// category, otherwise `ValidationFailed` carries the missing ones.
    pub(crate) fn unique_product_count(&self, category_ids: &[i64]) -> CatalogResult<i64> {
        if category_ids.is_empty() {
            return Ok(0);
        }
        let existing = super::existing_ids(&self.conn, "categories", category_ids)?;
        let missing = super::missing_ids(category_ids, &existing);
        if !missing.is_empty() {
            return Err(CatalogError::ValidationFailed {
                entity: Entity::Category,
                missing,
            });
        }

        let sql = format!(
            "SELECT COUNT(DISTINCT product_id) FROM product_categories WHERE category_id IN ({})",
            super::placeholders(1, category_ids.len())
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        for id in category_ids {
            params.push(Box::new(*id));
        }
        let refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        Ok(self
            .conn
            .query_row(&sql, refs.as_slice(), |row| row.get(0))?)
    }

    /// Every product with its aggregated category ids, ordered by id.
    pub(crate) fn get_products(&self) -> CatalogResult<Vec<ProductWithCategories>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.name, p.price, pc.category_id
             FROM products p
             LEFT JOIN product_categories pc ON pc.product_id = p.id
             ORDER BY p.id, pc.rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            let price_str: String = row.get(2)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                Decimal::from_str(&price_str).unwrap_or_default(),
                row.get::<_, Option<i64>>(3)?,
            ))
        })?;

        let mut products: Vec<ProductWithCategories> = Vec::new();
        for row in rows {
            let (id, name, price, cat_id) = row?;
            match products.last_mut() {
                Some(last) if last.id == id => {
                    if let Some(cat_id) = cat_id {
                        last.category_ids.push(cat_id);
                    }
                }
                _ => products.push(ProductWithCategories {
                    id,
                    name,
                    price,
                    category_ids: cat_id.into_iter().collect(),
                }),
            }
        }
        Ok(products)
    }
}
