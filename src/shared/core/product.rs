// Product document as seen by the synchronization and import paths.
//
// Purpose
// - Hold the owned product fields and the denormalized fields maintained from sibling services.
//
// Responsibilities
// - Describe the typed field-group updates the store applies under optimistic concurrency.
// - Track the recently applied inbound event identifiers alongside the mutation they caused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Number of applied event identifiers remembered on each product document.
pub const RECENT_EVENT_WINDOW: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    Archived,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxonomy {
    pub department: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAggregates {
    pub average_rating: f64,
    pub total_review_count: u64,
    /// Index 0 holds one-star reviews, index 4 five-star reviews.
    pub rating_distribution: [u64; 5],
    pub verified_purchase_count: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for ReviewAggregates {
    fn default() -> Self {
        Self {
            average_rating: 0.0,
            total_review_count: 0,
            rating_distribution: [0; 5],
            verified_purchase_count: 0,
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AvailabilityState {
    InStock,
    LowStock,
    OutOfStock,
    PreOrder,
    Discontinued,
}

impl fmt::Display for AvailabilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AvailabilityState::InStock => "in-stock",
            AvailabilityState::LowStock => "low-stock",
            AvailabilityState::OutOfStock => "out-of-stock",
            AvailabilityState::PreOrder => "pre-order",
            AvailabilityState::Discontinued => "discontinued",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityStatus {
    pub status: AvailabilityState,
    pub available_quantity: u64,
    pub low_stock_threshold: u64,
    pub discontinued: bool,
    pub available_date: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaStats {
    pub total_questions: u64,
    pub answered_questions: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadgeType {
    BestSeller,
    Trending,
    HotDeal,
    New,
    LowStock,
    Exclusive,
}

impl BadgeType {
    pub fn label(self) -> &'static str {
        match self {
            BadgeType::BestSeller => "Best Seller",
            BadgeType::Trending => "Trending",
            BadgeType::HotDeal => "Hot Deal",
            BadgeType::New => "New",
            BadgeType::LowStock => "Low Stock",
            BadgeType::Exclusive => "Exclusive",
        }
    }

    pub fn default_priority(self) -> u32 {
        match self {
            BadgeType::LowStock => 25,
            BadgeType::BestSeller => 20,
            BadgeType::HotDeal => 18,
            BadgeType::Trending => 15,
            BadgeType::Exclusive => 12,
            BadgeType::New => 10,
        }
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BadgeType::BestSeller => "best-seller",
            BadgeType::Trending => "trending",
            BadgeType::HotDeal => "hot-deal",
            BadgeType::New => "new",
            BadgeType::LowStock => "low-stock",
            BadgeType::Exclusive => "exclusive",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadgeSource {
    Manual,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    #[serde(rename = "type")]
    pub badge_type: BadgeType,
    pub label: String,
    pub priority: u32,
    pub source: BadgeSource,
    pub expires_at: Option<DateTime<Utc>>,
    pub assigned_at: DateTime<Utc>,
}

impl Badge {
    pub fn auto(badge_type: BadgeType, assigned_at: DateTime<Utc>) -> Self {
        Self {
            badge_type,
            label: badge_type.label().to_string(),
            priority: badge_type.default_priority(),
            source: BadgeSource::Auto,
            expires_at: None,
            assigned_at,
        }
    }

    pub fn manual(
        badge_type: BadgeType,
        assigned_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            source: BadgeSource::Manual,
            expires_at,
            ..Self::auto(badge_type, assigned_at)
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Highest priority first, older assignments first within a priority.
pub fn sort_badges(badges: &mut [Badge]) {
    badges.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.assigned_at.cmp(&b.assigned_at))
    });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub brand: Option<String>,
    pub taxonomy: Taxonomy,
    pub tags: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub status: ProductStatus,
    pub review_aggregates: ReviewAggregates,
    pub availability_status: Option<AvailabilityStatus>,
    pub qa_stats: QaStats,
    pub badges: Vec<Badge>,
    pub badge_evaluated_at: BTreeMap<BadgeType, DateTime<Utc>>,
    pub recent_event_ids: VecDeque<String>,
    pub import_job_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        sku: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            sku: sku.into(),
            name: name.into(),
            description: None,
            price,
            brand: None,
            taxonomy: Taxonomy::default(),
            tags: Vec::new(),
            attributes: BTreeMap::new(),
            status: ProductStatus::Active,
            review_aggregates: ReviewAggregates::default(),
            availability_status: None,
            qa_stats: QaStats::default(),
            badges: Vec::new(),
            badge_evaluated_at: BTreeMap::new(),
            recent_event_ids: VecDeque::new(),
            import_job_id: None,
            created_at,
            version: 0,
        }
    }

    pub fn has_applied(&self, event_id: &str) -> bool {
        self.recent_event_ids.iter().any(|id| id == event_id)
    }

    /// Apply one field-group update, remember the event, and bump the document version.
    pub fn apply_update(&mut self, update: DenormalizedUpdate) {
        match update.change {
            DenormalizedChange::Reviews(aggregates) => self.review_aggregates = aggregates,
            DenormalizedChange::Availability(status) => self.availability_status = Some(status),
            DenormalizedChange::Qa(stats) => self.qa_stats = stats,
            DenormalizedChange::Badges {
                badges,
                badge_type,
                evaluated_at,
            } => {
                self.badges = badges;
                self.badge_evaluated_at.insert(badge_type, evaluated_at);
            }
        }
        self.recent_event_ids.push_back(update.event_id);
        while self.recent_event_ids.len() > RECENT_EVENT_WINDOW {
            self.recent_event_ids.pop_front();
        }
        self.version += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DenormalizedChange {
    Reviews(ReviewAggregates),
    Availability(AvailabilityStatus),
    Qa(QaStats),
    Badges {
        badges: Vec<Badge>,
        badge_type: BadgeType,
        evaluated_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenormalizedUpdate {
    pub event_id: String,
    pub change: DenormalizedChange,
}

#[cfg(test)]
mod product_tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::{fixture, rstest};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[rstest]
    fn it_should_bump_the_version_and_remember_the_event(now: DateTime<Utc>) {
        let mut product = Product::new("p-1", "SKU-1", "Shirt", 10.0, now);
        product.apply_update(DenormalizedUpdate {
            event_id: "evt-1".into(),
            change: DenormalizedChange::Qa(QaStats {
                total_questions: 1,
                answered_questions: 0,
                last_updated: Some(now),
            }),
        });
        assert_eq!(product.version, 1);
        assert_eq!(product.qa_stats.total_questions, 1);
        assert!(product.has_applied("evt-1"));
        assert!(!product.has_applied("evt-2"));
    }

    #[rstest]
    fn it_should_bound_the_applied_event_window(now: DateTime<Utc>) {
        let mut product = Product::new("p-1", "SKU-1", "Shirt", 10.0, now);
        for i in 0..(RECENT_EVENT_WINDOW + 5) {
            product.apply_update(DenormalizedUpdate {
                event_id: format!("evt-{i}"),
                change: DenormalizedChange::Qa(QaStats::default()),
            });
        }
        assert_eq!(product.recent_event_ids.len(), RECENT_EVENT_WINDOW);
        assert!(!product.has_applied("evt-0"));
        assert!(product.has_applied(&format!("evt-{}", RECENT_EVENT_WINDOW + 4)));
    }

    #[rstest]
    fn it_should_order_badges_by_priority_then_assignment(now: DateTime<Utc>) {
        let mut badges = vec![
            Badge::auto(BadgeType::Trending, now),
            Badge::auto(BadgeType::BestSeller, now + Duration::minutes(5)),
            Badge::manual(BadgeType::New, now - Duration::days(1), None),
            Badge::auto(BadgeType::BestSeller, now),
        ];
        sort_badges(&mut badges);
        let order: Vec<_> = badges.iter().map(|b| (b.badge_type, b.assigned_at)).collect();
        assert_eq!(
            order,
            vec![
                (BadgeType::BestSeller, now),
                (BadgeType::BestSeller, now + Duration::minutes(5)),
                (BadgeType::Trending, now),
                (BadgeType::New, now - Duration::days(1)),
            ]
        );
    }

    #[rstest]
    fn it_should_treat_a_badge_expiring_now_as_expired(now: DateTime<Utc>) {
        let badge = Badge::manual(BadgeType::Exclusive, now - Duration::days(2), Some(now));
        assert!(badge.is_expired(now));
        assert!(!badge.is_expired(now - Duration::seconds(1)));
        assert!(!Badge::auto(BadgeType::Trending, now).is_expired(now));
    }
}
