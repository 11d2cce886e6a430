use crate::domain::money::Amount;
use crate::domain::{OrderId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "usd";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    /// Card payment settled by the external processor.
    External,
    /// Internal wallet ledger movement.
    Wallet,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// What a payment record represents. Determines the sign of its wallet
/// effect, which keeps the ledger history auditable.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Buyer pays for an order (debits the wallet only on the wallet rail).
    OrderCharge,
    /// External top-up credited to a wallet.
    WalletTopUp,
    /// Escrow released to the seller at settlement.
    SellerPayout,
    /// Escrow returned to the buyer on cancellation or refund.
    BuyerRefund,
}

/// An immutable record of one money movement.
///
/// `reference` is the idempotency key: the external event id for webhook
/// rails, or a deterministic `wallet-order-{id}` / `payout-order-{id}` /
/// `refund-order-{id}` string for internal movements. Only `status` may
/// change after creation, and only `pending -> completed | failed`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub reference: String,
    pub user_id: UserId,
    pub order_id: Option<OrderId>,
    pub amount: Amount,
    pub currency: String,
    pub provider: PaymentProvider,
    pub kind: PaymentKind,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    /// Signed wallet delta of this record: positive for credits, negative
    /// for debits, zero for movements that never touch the wallet (external
    /// card charges). Only completed records have an effect.
    pub fn wallet_effect(&self) -> Decimal {
        if !self.is_completed() {
            return Decimal::ZERO;
        }
        match (self.kind, self.provider) {
            (PaymentKind::OrderCharge, PaymentProvider::Wallet) => -self.amount.value(),
            (PaymentKind::OrderCharge, PaymentProvider::External) => Decimal::ZERO,
            (PaymentKind::WalletTopUp, _)
            | (PaymentKind::SellerPayout, _)
            | (PaymentKind::BuyerRefund, _) => self.amount.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payment(kind: PaymentKind, provider: PaymentProvider, status: PaymentStatus) -> Payment {
        Payment {
            reference: "evt_1".to_string(),
            user_id: 1,
            order_id: Some(1),
            amount: Amount::new(dec!(100.00)).unwrap(),
            currency: DEFAULT_CURRENCY.to_string(),
            provider,
            kind,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_wallet_effect_signs() {
        let charge = payment(
            PaymentKind::OrderCharge,
            PaymentProvider::Wallet,
            PaymentStatus::Completed,
        );
        assert_eq!(charge.wallet_effect(), dec!(-100.00));

        let card = payment(
            PaymentKind::OrderCharge,
            PaymentProvider::External,
            PaymentStatus::Completed,
        );
        assert_eq!(card.wallet_effect(), dec!(0));

        let topup = payment(
            PaymentKind::WalletTopUp,
            PaymentProvider::External,
            PaymentStatus::Completed,
        );
        assert_eq!(topup.wallet_effect(), dec!(100.00));

        let payout = payment(
            PaymentKind::SellerPayout,
            PaymentProvider::Wallet,
            PaymentStatus::Completed,
        );
        assert_eq!(payout.wallet_effect(), dec!(100.00));
    }

    #[test]
    fn test_pending_payment_has_no_effect() {
        let p = payment(
            PaymentKind::WalletTopUp,
            PaymentProvider::External,
            PaymentStatus::Pending,
        );
        assert_eq!(p.wallet_effect(), dec!(0));
    }
}
