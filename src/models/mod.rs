mod category;
mod product;

pub use category::{Category, CategoryPatch, CategoryProductCount, ParentPatch};
pub use product::{Product, ProductPatch, ProductWithCategories};
