// Review aggregate maintenance.
//
// The distribution is the source of truth: the total and the average are always
// recomputed from it, never adjusted incrementally.

use crate::shared::core::product::ReviewAggregates;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewChange {
    Created { rating: u8, verified: bool },
    Updated { old_rating: u8, new_rating: u8 },
    Deleted { rating: u8, verified: bool },
}

fn bucket(rating: u8) -> usize {
    usize::from(rating.clamp(1, 5) - 1)
}

pub fn average_from_distribution(distribution: &[u64; 5]) -> f64 {
    let total: u64 = distribution.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let weighted: u64 = distribution
        .iter()
        .enumerate()
        .map(|(i, count)| (i as u64 + 1) * count)
        .sum();
    weighted as f64 / total as f64
}

pub fn apply_review_change(
    current: &ReviewAggregates,
    change: ReviewChange,
    at: DateTime<Utc>,
) -> ReviewAggregates {
    let mut distribution = current.rating_distribution;
    let mut verified_purchase_count = current.verified_purchase_count;

    match change {
        ReviewChange::Created { rating, verified } => {
            distribution[bucket(rating)] += 1;
            if verified {
                verified_purchase_count += 1;
            }
        }
        ReviewChange::Updated {
            old_rating,
            new_rating,
        } => {
            let old = bucket(old_rating);
            distribution[old] = distribution[old].saturating_sub(1);
            distribution[bucket(new_rating)] += 1;
        }
        ReviewChange::Deleted { rating, verified } => {
            let slot = bucket(rating);
            distribution[slot] = distribution[slot].saturating_sub(1);
            if verified {
                verified_purchase_count = verified_purchase_count.saturating_sub(1);
            }
        }
    }

    ReviewAggregates {
        average_rating: average_from_distribution(&distribution),
        total_review_count: distribution.iter().sum(),
        rating_distribution: distribution,
        verified_purchase_count,
        last_updated: Some(at),
    }
}
