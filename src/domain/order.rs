use crate::domain::money::Amount;
use crate::domain::{GigId, OrderId, UserId};
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Active,
    Delivered,
    Disputed,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// The transition table. This is the single place that encodes which
    /// status changes are legal; everything else consults it.
    pub fn successors(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Active, Cancelled],
            Active => &[Delivered, Disputed, Cancelled],
            Delivered => &[Completed, Disputed],
            Disputed => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Active => "active",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Disputed => "disputed",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

impl FromStr for OrderStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "active" => Ok(OrderStatus::Active),
            "delivered" => Ok(OrderStatus::Delivered),
            "disputed" => Ok(OrderStatus::Disputed),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(MarketError::Validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Who is asking for a transition, from the order's point of view.
///
/// `System` is used internally by payment reconciliation and dispute
/// resolution; it is bound by the transition table but not by the per-role
/// restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    Buyer,
    Seller,
    Admin,
    System,
}

impl Requester {
    fn may_request(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match self {
            Requester::Buyer => matches!(next, Completed | Disputed),
            Requester::Seller => matches!(next, Active | Delivered | Cancelled),
            Requester::Admin | Requester::System => true,
        }
    }
}

/// The central marketplace transaction.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub gig_id: GigId,
    pub amount: Amount,
    /// Platform cut, informational. Subtracted from the seller payout at
    /// settlement.
    pub commission: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Applies a status transition if it is an edge of the table and the
    /// requester's role permits asking for it. On rejection the order is
    /// left untouched.
    ///
    /// Callers must hold the order's row lock so that check-then-apply is
    /// atomic with respect to concurrent requests.
    pub fn attempt_transition(
        &mut self,
        requester: Requester,
        next: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        if !self.status.successors().contains(&next) || !requester.may_request(next) {
            return Err(MarketError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Seller payout at settlement: the order amount minus the platform
    /// commission.
    pub fn payout_amount(&self) -> Result<Amount, MarketError> {
        Amount::new(self.amount.value() - self.commission)
    }
}
