use serde::Serialize;

use crate::error::CatalogError;

/// Response envelope the request layer hands back for every operation,
/// matching the shape `{status, data, detail}`.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<T: Serialize> {
    pub(crate) status: &'static str,
    pub(crate) data: Option<T>,
    pub(crate) detail: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub(crate) fn success(data: T) -> Self {
        Self {
            status: "success",
            data: Some(data),
            detail: None,
        }
    }

    pub(crate) fn failure(err: &CatalogError) -> Self {
        Self {
            status: "error",
            data: None,
            detail: Some(public_detail(err)),
        }
    }
}

/// HTTP-equivalent status code for a repository failure.
pub(crate) fn status_code(err: &CatalogError) -> u16 {
    match err {
        CatalogError::NotFound { .. } => 404,
        // Failed bulk-id validation signals "not found" to the caller.
        CatalogError::ValidationFailed { .. } => 404,
        CatalogError::ConstraintViolation(_) => 400,
        CatalogError::Unexpected(_) => 500,
    }
}

/// Caller-facing message. Store-level failures stay generic; the real
/// error goes to the log instead.
pub(crate) fn public_detail(err: &CatalogError) -> String {
    match err {
        CatalogError::Unexpected(e) => {
            tracing::error!(error = %e, "unexpected store failure");
            "internal error".to_string()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Entity;

    #[test]
    fn test_status_codes() {
        let not_found = CatalogError::not_found(Entity::Product, 7);
        assert_eq!(status_code(&not_found), 404);

        let invalid = CatalogError::ValidationFailed {
            entity: Entity::Category,
            missing: vec![99],
        };
        assert_eq!(status_code(&invalid), 404);

        let constraint = CatalogError::ConstraintViolation("parent category does not exist".into());
        assert_eq!(status_code(&constraint), 400);

        let unexpected = CatalogError::Unexpected(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(status_code(&unexpected), 500);
    }

    #[test]
    fn test_unexpected_detail_is_generic() {
        let unexpected = CatalogError::Unexpected(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(public_detail(&unexpected), "internal error");
    }

    #[test]
    fn test_success_envelope_shape() {
        let env = Envelope::success(vec![1, 2, 3]);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"][2], 3);
        assert!(json["detail"].is_null());
    }

    #[test]
    fn test_failure_envelope_names_entity() {
        let err = CatalogError::not_found(Entity::Category, 12);
        let env: Envelope<()> = Envelope::failure(&err);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json["data"].is_null());
        assert_eq!(json["detail"], "category 12 does not exist");
    }
}
