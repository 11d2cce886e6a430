use crate::domain::money::Amount;
use crate::domain::{GigId, UserId};
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PackageTier {
    Basic,
    Standard,
    Premium,
}

impl FromStr for PackageTier {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(PackageTier::Basic),
            "standard" => Ok(PackageTier::Standard),
            "premium" => Ok(PackageTier::Premium),
            other => Err(MarketError::Validation(format!(
                "unknown package tier: {other}"
            ))),
        }
    }
}

/// A seller's offering. Read-only input to order creation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Gig {
    pub id: GigId,
    pub seller_id: UserId,
    pub title: String,
    pub price_basic: Amount,
    pub price_standard: Option<Amount>,
    pub price_premium: Option<Amount>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

impl Gig {
    /// Price for the requested tier. Tiers without a configured price fall
    /// back to the basic price.
    pub fn price_for(&self, tier: PackageTier) -> Amount {
        match tier {
            PackageTier::Basic => self.price_basic,
            PackageTier::Standard => self.price_standard.unwrap_or(self.price_basic),
            PackageTier::Premium => self.price_premium.unwrap_or(self.price_basic),
        }
    }
}
