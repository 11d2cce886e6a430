use crate::domain::{DisputeId, OrderId, UserId};
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DisputeStatus {
    Open,
    Resolved,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    FavorBuyer,
    FavorSeller,
}

impl FromStr for DisputeOutcome {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "favor_buyer" => Ok(DisputeOutcome::FavorBuyer),
            "favor_seller" => Ok(DisputeOutcome::FavorSeller),
            other => Err(MarketError::Validation(format!(
                "unknown dispute outcome: {other}"
            ))),
        }
    }
}

/// A participant-raised challenge that suspends an order's normal flow until
/// an admin resolves it. Terminal once resolved.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Dispute {
    pub id: DisputeId,
    pub order_id: OrderId,
    pub raised_by: UserId,
    pub reason: String,
    pub status: DisputeStatus,
    pub outcome: Option<DisputeOutcome>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Dispute {
    pub fn resolve(
        &mut self,
        outcome: DisputeOutcome,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        if self.status == DisputeStatus::Resolved {
            return Err(MarketError::AlreadyResolved);
        }
        self.status = DisputeStatus::Resolved;
        self.outcome = Some(outcome);
        self.resolution_notes = Some(notes.into());
        self.resolved_at = Some(now);
        Ok(())
    }
}
