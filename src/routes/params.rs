use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Clone, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// 1-based page number, default 1.
    pub page: Option<i64>,
    /// Items per page.
    #[serde(alias = "per_page", alias = "page_size")]
    pub page_size: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    pub fn normalize(&self) -> (i64, i64, i64) {
        self.normalize_with(DEFAULT_PAGE_SIZE)
    }

    /// Returns `(page, per_page, offset)` with the page clamped to at least 1.
    pub fn normalize_with(&self, default_page_size: i64) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .page_size
            .unwrap_or(default_page_size)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

/// Treats blank search strings as "no filter".
pub fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

// Query strings are deserialized through serde_urlencoded, which cannot parse
// numbers inside `#[serde(flatten)]` structs, so list queries repeat the paging fields.

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    #[serde(alias = "per_page", alias = "page_size")]
    pub page_size: Option<i64>,
    /// Matches order number, customer first/last name or email.
    pub search: Option<String>,
    pub status: Option<String>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SellerProductQuery {
    pub page: Option<i64>,
    #[serde(alias = "per_page", alias = "page_size")]
    pub page_size: Option<i64>,
    /// Matches product name or SKU.
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
}

impl SellerProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ContactListQuery {
    pub page: Option<i64>,
    #[serde(alias = "per_page", alias = "page_size")]
    pub page_size: Option<i64>,
    /// Matches sender name, email or subject.
    pub search: Option<String>,
}

impl ContactListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<i64>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            page_size: None,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ChartQuery {
    /// `requests`, `response_time` or `errors`.
    #[serde(rename = "type")]
    pub series: Option<String>,
    /// Number of hours back from now, default 24.
    pub hours: Option<i64>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_page_and_size() {
        let (page, per_page, offset) = Pagination::new(0, 500).normalize();
        assert_eq!((page, per_page, offset), (1, MAX_PAGE_SIZE, 0));

        let (page, per_page, offset) = Pagination::new(3, 10).normalize();
        assert_eq!((page, per_page, offset), (3, 10, 20));
    }

    #[test]
    fn normalize_uses_endpoint_default() {
        let (_, per_page, _) = Pagination::default().normalize_with(10);
        assert_eq!(per_page, 10);
    }

    #[test]
    fn blank_search_is_no_filter() {
        assert_eq!(non_blank(Some(&"   ".to_string())), None);
        assert_eq!(non_blank(Some(&" ORD-1 ".to_string())), Some("ORD-1"));
        assert_eq!(non_blank(None), None);
    }
}
