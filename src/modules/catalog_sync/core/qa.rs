// Q&A counters. answered_questions never exceeds total_questions.

use crate::shared::core::product::QaStats;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaChange {
    QuestionCreated,
    AnswerCreated { first_answer: bool },
    QuestionDeleted { had_answers: bool },
}

pub fn apply_qa_change(current: &QaStats, change: QaChange, at: DateTime<Utc>) -> QaStats {
    let mut total = current.total_questions;
    let mut answered = current.answered_questions;
    match change {
        QaChange::QuestionCreated => total += 1,
        QaChange::AnswerCreated { first_answer } => {
            if first_answer && answered < total {
                answered += 1;
            }
        }
        QaChange::QuestionDeleted { had_answers } => {
            total = total.saturating_sub(1);
            if had_answers {
                answered = answered.saturating_sub(1);
            }
        }
    }
    QaStats {
        total_questions: total,
        answered_questions: answered.min(total),
        last_updated: Some(at),
    }
}
