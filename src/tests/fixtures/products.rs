// Shared test fixture for product documents.

use crate::shared::core::product::{Badge, Product, ReviewAggregates};
use chrono::{TimeZone, Utc};

pub struct ProductBuilder {
    inner: Product,
}

impl Default for ProductBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl ProductBuilder {
    pub fn new() -> Self {
        let created_at = Utc.with_ymd_and_hms(2024, 11, 1, 9, 0, 0).unwrap();
        Self {
            inner: Product::new(
                "prod-fixed-0001",
                "SKU-FIXED-0001",
                "Classic Tee",
                19.99,
                created_at,
            ),
        }
    }

    pub fn id(mut self, v: impl Into<String>) -> Self {
        self.inner.id = v.into();
        self
    }

    pub fn sku(mut self, v: impl Into<String>) -> Self {
        self.inner.sku = v.into();
        self
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.inner.name = v.into();
        self
    }

    pub fn reviews(mut self, v: ReviewAggregates) -> Self {
        self.inner.review_aggregates = v;
        self
    }

    pub fn badges(mut self, v: Vec<Badge>) -> Self {
        self.inner.badges = v;
        self
    }

    pub fn build(self) -> Product {
        self.inner
    }
}
