use serde::Deserialize;
use utoipa::ToSchema;

/// Offset/limit window for the catalog listing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListRange {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ListRange {
    pub fn normalize(&self) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(100).clamp(1, 100);
        (skip, limit)
    }
}
