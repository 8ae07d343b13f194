//! Common types and utilities for the Lightdash API

use super::error::ApiError;
use serde::{Deserialize, Serialize};

/// Success envelope: `{"status":"ok","results":...}`
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    #[serde(default)]
    pub results: serde_json::Value,
}

/// Error envelope: `{"status":"error","error":{...}}`
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub status: String,
    pub error: ApiErrorDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorDetails {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One page of a paginated listing
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    #[serde(default)]
    pub total_page_count: u32,
    #[serde(default)]
    pub total_results: u32,
}

impl<T> Paginated<T> {
    /// True when a later page may hold more entries
    pub fn has_more(&self) -> bool {
        match &self.pagination {
            Some(p) => p.page < p.total_page_count,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy)]
pub struct PaginationParams {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn next(self) -> Self {
        self.with_page(self.page + 1)
    }

    pub fn to_query_params(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add("page", self.page)
            .add("pageSize", self.page_size)
    }
}

/// Rejects DTOs that decoded without an identifier
pub fn ensure_uuid(value: &str, what: &'static str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::MissingUuid(what));
    }
    Ok(())
}

/// Escapes a single path segment
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `{"userUuid": ...}` entries used by group membership payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUuidRef {
    pub user_uuid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_are_encoded() {
        let params = ApiQueryParams::new()
            .add("searchQuery", "a b&c")
            .add("page", 2)
            .add_optional("includeMembers", Some(10))
            .add_optional("none", None::<String>);

        let query = params.to_query_string();
        assert_eq!(query, "?searchQuery=a%20b%26c&page=2&includeMembers=10");
    }

    #[test]
    fn empty_query_params_produce_empty_string() {
        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }

    #[test]
    fn pagination_params_advance() {
        let params = PaginationParams::new().with_page_size(50).next();
        assert_eq!(params.to_query_params().to_query_string(), "?page=2&pageSize=50");
    }

    #[test]
    fn paginated_has_more_uses_total_page_count() {
        let page: Paginated<String> = serde_json::from_str(
            r#"{"data":["a"],"pagination":{"page":1,"pageSize":1,"totalPageCount":2,"totalResults":2}}"#,
        )
        .unwrap();
        assert!(page.has_more());

        let last: Paginated<String> = serde_json::from_str(r#"{"data":["a"]}"#).unwrap();
        assert!(!last.has_more());
    }

    #[test]
    fn ensure_uuid_rejects_blank_values() {
        assert!(ensure_uuid("f0b7", "space uuid").is_ok());
        assert!(matches!(
            ensure_uuid("  ", "space uuid"),
            Err(ApiError::MissingUuid("space uuid"))
        ));
    }

    #[test]
    fn error_envelope_parses() {
        let body = r#"{"status":"error","error":{"statusCode":404,"name":"NotFoundError","message":"Space not found"}}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "error");
        assert_eq!(parsed.error.status_code, Some(404));
        assert_eq!(parsed.error.message.as_deref(), Some("Space not found"));
    }
}
