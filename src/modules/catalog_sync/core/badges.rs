// Automatic badge evaluation.
//
// Purpose
// - Map one analytics snapshot to an assign/remove/keep verdict for the badge type it drives.
//
// Responsibilities
// - Apply hysteresis for Trending and Hot Deal: assign and remove thresholds differ.
// - Only touch auto badges. A manual badge of the same type is never removed and
//   suppresses the auto one.
// - Drop expired badges of any source on every pass.

use crate::shared::core::product::{Badge, BadgeSource, BadgeType, sort_badges};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const BEST_SELLER_MAX_RANK: u64 = 100;
pub const TRENDING_ASSIGN_GROWTH: f64 = 50.0;
pub const TRENDING_REMOVE_GROWTH: f64 = 30.0;
pub const HOT_DEAL_ASSIGN_FACTOR: f64 = 1.20;
pub const HOT_DEAL_REMOVE_FACTOR: f64 = 1.10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricsSnapshot {
    Sales {
        category_rank: u64,
    },
    Views {
        growth_percent: f64,
    },
    Conversions {
        conversion_rate: f64,
        category_average: f64,
    },
}

impl MetricsSnapshot {
    pub fn badge_type(&self) -> BadgeType {
        match self {
            MetricsSnapshot::Sales { .. } => BadgeType::BestSeller,
            MetricsSnapshot::Views { .. } => BadgeType::Trending,
            MetricsSnapshot::Conversions { .. } => BadgeType::HotDeal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Assign,
    Remove,
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalReason {
    BelowThreshold,
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BadgeEvaluation {
    pub badges: Vec<Badge>,
    pub assigned: Option<Badge>,
    /// Auto badges taken off, with the reason. Expired manual badges are dropped silently.
    pub removed: Vec<(Badge, RemovalReason)>,
    pub changed: bool,
}

pub fn verdict(snapshot: MetricsSnapshot) -> Verdict {
    match snapshot {
        MetricsSnapshot::Sales { category_rank } => {
            if category_rank <= BEST_SELLER_MAX_RANK {
                Verdict::Assign
            } else {
                Verdict::Remove
            }
        }
        MetricsSnapshot::Views { growth_percent } => {
            if growth_percent >= TRENDING_ASSIGN_GROWTH {
                Verdict::Assign
            } else if growth_percent < TRENDING_REMOVE_GROWTH {
                Verdict::Remove
            } else {
                Verdict::Keep
            }
        }
        MetricsSnapshot::Conversions {
            conversion_rate,
            category_average,
        } => {
            if category_average <= 0.0 {
                Verdict::Keep
            } else if conversion_rate >= category_average * HOT_DEAL_ASSIGN_FACTOR {
                Verdict::Assign
            } else if conversion_rate < category_average * HOT_DEAL_REMOVE_FACTOR {
                Verdict::Remove
            } else {
                Verdict::Keep
            }
        }
    }
}

pub fn evaluate(
    current: &[Badge],
    snapshot: MetricsSnapshot,
    now: DateTime<Utc>,
) -> BadgeEvaluation {
    let badge_type = snapshot.badge_type();
    let mut removed = Vec::new();
    let mut expired_any = false;

    let mut badges: Vec<Badge> = Vec::with_capacity(current.len() + 1);
    for badge in current {
        if badge.is_expired(now) {
            expired_any = true;
            if badge.source == BadgeSource::Auto {
                removed.push((badge.clone(), RemovalReason::Expired));
            }
        } else {
            badges.push(badge.clone());
        }
    }

    let holds = |source: BadgeSource, badges: &[Badge]| {
        badges
            .iter()
            .any(|b| b.badge_type == badge_type && b.source == source)
    };

    let mut assigned = None;
    match verdict(snapshot) {
        Verdict::Assign => {
            if !holds(BadgeSource::Manual, &badges) && !holds(BadgeSource::Auto, &badges) {
                let badge = Badge::auto(badge_type, now);
                badges.push(badge.clone());
                assigned = Some(badge);
            }
        }
        Verdict::Remove => {
            let (dropped, kept): (Vec<Badge>, Vec<Badge>) = badges
                .into_iter()
                .partition(|b| b.badge_type == badge_type && b.source == BadgeSource::Auto);
            badges = kept;
            removed.extend(dropped.into_iter().map(|b| (b, RemovalReason::BelowThreshold)));
        }
        Verdict::Keep => {}
    }

    sort_badges(&mut badges);
    let changed = expired_any || assigned.is_some() || !removed.is_empty();
    BadgeEvaluation {
        badges,
        assigned,
        removed,
        changed,
    }
}
