use crate::domain::money::Amount;
use crate::domain::{UserId, WithdrawalId};
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A request to convert wallet balance into external funds.
///
/// The wallet is debited only on approval; the approved row is itself the
/// durable record paired with that debit.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub user_id: UserId,
    pub amount: Amount,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Withdrawal {
    pub fn decide(
        &mut self,
        status: WithdrawalStatus,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        if self.status != WithdrawalStatus::Pending {
            return Err(MarketError::AlreadyDecided);
        }
        self.status = status;
        self.decided_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn withdrawal() -> Withdrawal {
        Withdrawal {
            id: 1,
            user_id: 20,
            amount: Amount::new(dec!(40.00)).unwrap(),
            status: WithdrawalStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
        }
    }

    #[test]
    fn test_decide_once() {
        let mut w = withdrawal();
        w.decide(WithdrawalStatus::Approved, Utc::now()).unwrap();
        assert_eq!(w.status, WithdrawalStatus::Approved);
        assert!(w.decided_at.is_some());
    }

    #[test]
    fn test_deciding_twice_fails() {
        let mut w = withdrawal();
        w.decide(WithdrawalStatus::Rejected, Utc::now()).unwrap();
        let result = w.decide(WithdrawalStatus::Approved, Utc::now());
        assert!(matches!(result, Err(MarketError::AlreadyDecided)));
        assert_eq!(w.status, WithdrawalStatus::Rejected);
    }
}
