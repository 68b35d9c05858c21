// Parsed import rows and the rules a row must satisfy to become a product.

use crate::modules::bulk_import::core::job::RowError;
use crate::shared::core::product::{Product, Taxonomy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

pub const MAX_NAME_LENGTH: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportRow {
    pub row_number: u64,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub department: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RowRejection {
    #[error("sku is required")]
    MissingSku,

    #[error("name is required")]
    MissingName,

    #[error("name must be at most {MAX_NAME_LENGTH} characters, got {0}")]
    NameTooLong(usize),

    #[error("price is required")]
    MissingPrice,

    #[error("price must be a non-negative number, got {0}")]
    InvalidPrice(f64),

    #[error("sku {0} already exists")]
    DuplicateSku(String),

    #[error("row number {0} appears more than once")]
    DuplicateRowNumber(u64),
}

impl ImportRow {
    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn rejection(&self, rejection: RowRejection) -> RowError {
        RowError {
            row_number: self.row_number,
            sku: self.sku().map(String::from),
            message: rejection.to_string(),
        }
    }
}

pub fn validate_row(row: &ImportRow) -> Result<(), RowRejection> {
    if row.sku().is_none() {
        return Err(RowRejection::MissingSku);
    }
    let name = row
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(RowRejection::MissingName)?;
    let length = name.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(RowRejection::NameTooLong(length));
    }
    let price = row.price.ok_or(RowRejection::MissingPrice)?;
    if !price.is_finite() || price < 0.0 {
        return Err(RowRejection::InvalidPrice(price));
    }
    Ok(())
}

/// Stable product identifier for a row, so re-applying a batch targets the same documents.
pub fn product_id_for(job_id: &str, row_number: u64) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{job_id}:{row_number}").as_bytes()).to_string()
}

pub fn to_product(
    row: &ImportRow,
    job_id: &str,
    created_at: DateTime<Utc>,
) -> Result<Product, RowRejection> {
    validate_row(row)?;
    let sku = row.sku().ok_or(RowRejection::MissingSku)?;
    let name = row.name.as_deref().map(str::trim).unwrap_or_default();
    let price = row.price.ok_or(RowRejection::MissingPrice)?;

    let id = product_id_for(job_id, row.row_number);
    let mut product = Product::new(id, sku, name, price, created_at);
    product.description = row.description.clone();
    product.brand = row.brand.clone();
    product.taxonomy = Taxonomy {
        department: row.department.clone(),
        category: row.category.clone(),
        subcategory: row.subcategory.clone(),
    };
    product.tags = row.tags.clone();
    product.attributes = row.attributes.clone();
    product.import_job_id = Some(job_id.to_string());
    Ok(product)
}
