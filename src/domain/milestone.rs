use crate::domain::money::Amount;
use crate::domain::{MilestoneId, OrderId};
use crate::error::MarketError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneStatus {
    Pending,
    Completed,
}

/// Caller input for creating a milestone.
#[derive(Debug, Clone)]
pub struct MilestoneDraft {
    pub title: String,
    pub description: Option<String>,
    pub amount: Amount,
    pub due_date: Option<NaiveDate>,
}

/// A sub-deliverable inside one order. Owned by the order; mutated only by
/// the order's seller (or an admin) through the engine.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Milestone {
    pub id: MilestoneId,
    pub order_id: OrderId,
    pub title: String,
    pub description: Option<String>,
    pub amount: Amount,
    pub status: MilestoneStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Milestone {
    /// Marks the milestone completed and stamps the completion time.
    /// Completing twice is an error, not a silent success, so client bugs
    /// surface.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) -> Result<(), MarketError> {
        if self.status == MilestoneStatus::Completed {
            return Err(MarketError::MilestoneAlreadyCompleted);
        }
        self.status = MilestoneStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }
}
