// Shared test fixtures for parsed import rows.

use crate::modules::bulk_import::core::row::ImportRow;

pub struct ImportRowBuilder {
    inner: ImportRow,
}

impl Default for ImportRowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl ImportRowBuilder {
    pub fn new() -> Self {
        Self {
            inner: ImportRow {
                row_number: 1,
                sku: Some("SKU-1".to_string()),
                name: Some("Classic Tee".to_string()),
                price: Some(19.99),
                brand: Some("Outlet Basics".to_string()),
                department: Some("apparel".to_string()),
                tags: vec!["cotton".to_string()],
                ..ImportRow::default()
            },
        }
    }

    pub fn row_number(mut self, v: u64) -> Self {
        self.inner.row_number = v;
        self
    }

    pub fn sku(mut self, v: impl Into<String>) -> Self {
        self.inner.sku = Some(v.into());
        self
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.inner.name = Some(v.into());
        self
    }

    pub fn no_name(mut self) -> Self {
        self.inner.name = None;
        self
    }

    pub fn price(mut self, v: f64) -> Self {
        self.inner.price = Some(v);
        self
    }

    pub fn no_price(mut self) -> Self {
        self.inner.price = None;
        self
    }

    pub fn category(mut self, v: impl Into<String>) -> Self {
        self.inner.category = Some(v.into());
        self
    }

    pub fn build(self) -> ImportRow {
        self.inner
    }
}

/// Valid rows numbered 1..=count with SKUs `SKU-1`, `SKU-2`, ...
pub fn numbered_rows(count: u64) -> Vec<ImportRow> {
    (1..=count)
        .map(|n| {
            ImportRowBuilder::new()
                .row_number(n)
                .sku(format!("SKU-{n}"))
                .name(format!("Product {n}"))
                .price(10.0 + n as f64)
                .build()
        })
        .collect()
}
