use crate::domain::{OrderId, ReviewId, UserId};
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Feedback left by one order participant about the other, permitted only
/// once the order reaches `completed`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Review {
    pub id: ReviewId,
    pub order_id: OrderId,
    pub reviewer_id: UserId,
    pub seller_id: UserId,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn validate_rating(rating: u8) -> Result<(), MarketError> {
        if (1..=5).contains(&rating) {
            Ok(())
        } else {
            Err(MarketError::Validation(
                "rating must be between 1 and 5".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(Review::validate_rating(1).is_ok());
        assert!(Review::validate_rating(5).is_ok());
        assert!(Review::validate_rating(0).is_err());
        assert!(Review::validate_rating(6).is_err());
    }
}
