use crate::domain::UserId;
use crate::domain::money::{Amount, Balance};
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Both,
    Admin,
}

impl Role {
    pub fn can_buy(&self) -> bool {
        matches!(self, Role::Buyer | Role::Both)
    }

    pub fn can_sell(&self) -> bool {
        matches!(self, Role::Seller | Role::Both)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Both => "both",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "both" => Ok(Role::Both),
            "admin" => Ok(Role::Admin),
            other => Err(MarketError::Validation(format!("unknown role: {other}"))),
        }
    }
}

/// The authenticated caller of an engine operation, as supplied by the
/// identity layer. The engine trusts the identity but enforces role and
/// participant checks itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

/// A wallet holder.
///
/// `credit` and `debit` are the only code paths in the crate that change a
/// wallet balance; the engine pairs every call with exactly one durable
/// `Payment` or `Withdrawal` row in the same commit.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub wallet_balance: Balance,
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, role: Role, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            wallet_balance: Balance::ZERO,
            suspended: false,
            created_at,
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }

    /// Unconditionally adds funds to the wallet.
    pub fn credit(&mut self, amount: Amount) {
        self.wallet_balance += amount.into();
    }

    /// Removes funds from the wallet if the balance covers the amount.
    /// On shortfall the balance is left untouched.
    pub fn debit(&mut self, amount: Amount) -> Result<(), MarketError> {
        if self.wallet_balance.covers(amount) {
            self.wallet_balance -= amount.into();
            Ok(())
        } else {
            Err(MarketError::InsufficientFunds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn user(role: Role) -> User {
        User::new(1, "ada", role, Utc::now())
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Buyer.can_buy());
        assert!(!Role::Buyer.can_sell());
        assert!(Role::Both.can_buy());
        assert!(Role::Both.can_sell());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Seller.can_buy());
    }

    #[test]
    fn test_credit_then_debit() {
        let mut u = user(Role::Buyer);
        u.credit(Amount::new(dec!(150.00)).unwrap());
        assert_eq!(u.wallet_balance, Balance::new(dec!(150.00)));

        u.debit(Amount::new(dec!(100.00)).unwrap()).unwrap();
        assert_eq!(u.wallet_balance, Balance::new(dec!(50.00)));
    }

    #[test]
    fn test_debit_insufficient_leaves_balance_unchanged() {
        let mut u = user(Role::Buyer);
        u.credit(Amount::new(dec!(50.00)).unwrap());

        let result = u.debit(Amount::new(dec!(100.00)).unwrap());
        assert!(matches!(result, Err(MarketError::InsufficientFunds)));
        assert_eq!(u.wallet_balance, Balance::new(dec!(50.00)));
    }

    #[test]
    fn test_debit_exact_balance() {
        let mut u = user(Role::Both);
        u.credit(Amount::new(dec!(25.00)).unwrap());
        u.debit(Amount::new(dec!(25.00)).unwrap()).unwrap();
        assert_eq!(u.wallet_balance, Balance::ZERO);
    }
}
