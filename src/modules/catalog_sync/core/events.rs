// Inbound payloads from the review, inventory, analytics and Q&A services.
//
// Field names follow the publishers (camelCase). Shape errors surface from serde,
// value errors from `EventPayload::validate`; both end up as a dropped delivery.

use crate::shared::core::envelope::{EventPayload, PayloadError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an inbound event identifies its product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductRef {
    Id(String),
    /// Inventory events are keyed by SKU and carry the product id as a fallback.
    Sku {
        sku: String,
        product_id: Option<String>,
    },
}

impl ProductRef {
    pub fn label(&self) -> &str {
        match self {
            ProductRef::Id(id) => id,
            ProductRef::Sku { sku, .. } => sku,
        }
    }
}

fn require(field: &'static str, value: &str) -> Result<(), PayloadError> {
    if value.trim().is_empty() {
        return Err(PayloadError::InvalidField {
            field,
            reason: "must not be empty".into(),
        });
    }
    Ok(())
}

fn require_rating(field: &'static str, rating: u8) -> Result<(), PayloadError> {
    if !(1..=5).contains(&rating) {
        return Err(PayloadError::InvalidField {
            field,
            reason: format!("must be between 1 and 5, got {rating}"),
        });
    }
    Ok(())
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), PayloadError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PayloadError::InvalidField {
            field,
            reason: format!("must be a non-negative number, got {value}"),
        });
    }
    Ok(())
}

// Reviews

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCreated {
    pub review_id: String,
    pub product_id: String,
    pub rating: u8,
    #[serde(default)]
    pub verified_purchase: bool,
}

impl EventPayload for ReviewCreated {
    fn validate(&self) -> Result<(), PayloadError> {
        require("productId", &self.product_id)?;
        require_rating("rating", self.rating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdated {
    pub review_id: String,
    pub product_id: String,
    pub old_rating: u8,
    #[serde(alias = "rating")]
    pub new_rating: u8,
}

impl EventPayload for ReviewUpdated {
    fn validate(&self) -> Result<(), PayloadError> {
        require("productId", &self.product_id)?;
        require_rating("oldRating", self.old_rating)?;
        require_rating("newRating", self.new_rating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDeleted {
    pub review_id: String,
    pub product_id: String,
    pub rating: u8,
    #[serde(default)]
    pub verified_purchase: bool,
}

impl EventPayload for ReviewDeleted {
    fn validate(&self) -> Result<(), PayloadError> {
        require("productId", &self.product_id)?;
        require_rating("rating", self.rating)
    }
}

// Inventory

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdated {
    pub sku: String,
    #[serde(default)]
    pub product_id: Option<String>,
    pub available_quantity: u64,
    #[serde(default)]
    pub low_stock_threshold: Option<u64>,
    #[serde(default)]
    pub discontinued: bool,
    #[serde(default)]
    pub available_date: Option<DateTime<Utc>>,
}

impl EventPayload for StockUpdated {
    fn validate(&self) -> Result<(), PayloadError> {
        require("sku", &self.sku)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReserved {
    pub sku: String,
    #[serde(default)]
    pub product_id: Option<String>,
    pub reserved_quantity: u64,
    pub available_quantity: u64,
}

impl EventPayload for StockReserved {
    fn validate(&self) -> Result<(), PayloadError> {
        require("sku", &self.sku)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReleased {
    pub sku: String,
    #[serde(default)]
    pub product_id: Option<String>,
    pub released_quantity: u64,
    pub available_quantity: u64,
}

impl EventPayload for StockReleased {
    fn validate(&self) -> Result<(), PayloadError> {
        require("sku", &self.sku)
    }
}

// Analytics

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesUpdated {
    pub product_id: String,
    #[serde(default)]
    pub category: Option<String>,
    pub sales_last_30_days: u64,
    pub category_rank: u64,
}

impl EventPayload for SalesUpdated {
    fn validate(&self) -> Result<(), PayloadError> {
        require("productId", &self.product_id)?;
        if self.category_rank == 0 {
            return Err(PayloadError::InvalidField {
                field: "categoryRank",
                reason: "ranks start at 1".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewsUpdated {
    pub product_id: String,
    pub views_last_7_days: u64,
    pub views_prior_7_days: u64,
    #[serde(default)]
    pub view_growth_percent: Option<f64>,
}

impl ViewsUpdated {
    /// Reported growth, or growth derived from the two view windows.
    pub fn growth_percent(&self) -> f64 {
        if let Some(growth) = self.view_growth_percent {
            return growth;
        }
        if self.views_prior_7_days == 0 {
            return 0.0;
        }
        let last = self.views_last_7_days as f64;
        let prior = self.views_prior_7_days as f64;
        (last - prior) / prior * 100.0
    }
}

impl EventPayload for ViewsUpdated {
    fn validate(&self) -> Result<(), PayloadError> {
        require("productId", &self.product_id)?;
        if self.view_growth_percent.is_some_and(|g| !g.is_finite()) {
            return Err(PayloadError::InvalidField {
                field: "viewGrowthPercent",
                reason: "must be a finite number".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionsUpdated {
    pub product_id: String,
    #[serde(default)]
    pub category: Option<String>,
    pub conversion_rate: f64,
    pub category_average_conversion_rate: f64,
}

impl EventPayload for ConversionsUpdated {
    fn validate(&self) -> Result<(), PayloadError> {
        require("productId", &self.product_id)?;
        require_non_negative("conversionRate", self.conversion_rate)?;
        require_non_negative(
            "categoryAverageConversionRate",
            self.category_average_conversion_rate,
        )
    }
}

// Q&A

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCreated {
    pub question_id: String,
    pub product_id: String,
}

impl EventPayload for QuestionCreated {
    fn validate(&self) -> Result<(), PayloadError> {
        require("productId", &self.product_id)
    }
}

fn first_answer_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCreated {
    pub question_id: String,
    pub product_id: String,
    #[serde(default)]
    pub answer_id: Option<String>,
    /// Only the first answer of a question moves it to answered.
    #[serde(default = "first_answer_default")]
    pub first_answer: bool,
}

impl EventPayload for AnswerCreated {
    fn validate(&self) -> Result<(), PayloadError> {
        require("productId", &self.product_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDeleted {
    pub question_id: String,
    pub product_id: String,
    #[serde(default)]
    pub had_answers: bool,
}

impl EventPayload for QuestionDeleted {
    fn validate(&self) -> Result<(), PayloadError> {
        require("productId", &self.product_id)
    }
}
