use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Category,
    Product,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Product => "product",
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure modes surfaced by the repository layer.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A primary-key lookup yielded no row.
    #[error("{entity} {id} does not exist")]
    NotFound { entity: Entity, id: i64 },

    /// An insert/update/delete violated a store constraint (bad foreign
    /// key, empty name, negative price, restricted delete).
    #[error("{0}")]
    ConstraintViolation(String),

    /// A bulk operation referenced ids that do not all resolve to
    /// existing rows. Detected by the repository, not the store.
    #[error("one or more {entity} ids do not exist: {missing:?}")]
    ValidationFailed { entity: Entity, missing: Vec<i64> },

    /// Any other store-level failure.
    #[error(transparent)]
    Unexpected(#[from] rusqlite::Error),
}

impl CatalogError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Maps a store error from a statement that can only fail a known
    /// constraint, keeping every other failure as `Unexpected`.
    pub fn constraint(err: rusqlite::Error, detail: &str) -> Self {
        if let rusqlite::Error::SqliteFailure(e, _) = &err {
            if e.code == rusqlite::ErrorCode::ConstraintViolation {
                return Self::ConstraintViolation(detail.to_string());
            }
        }
        Self::Unexpected(err)
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
