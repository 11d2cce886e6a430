use crate::application::locks::{RowKey, RowLocks};
use crate::domain::dispute::{Dispute, DisputeOutcome, DisputeStatus};
use crate::domain::gig::PackageTier;
use crate::domain::milestone::{Milestone, MilestoneDraft, MilestoneStatus};
use crate::domain::money::Amount;
use crate::domain::order::{Order, OrderStatus, Requester};
use crate::domain::payment::{
    DEFAULT_CURRENCY, Payment, PaymentKind, PaymentProvider, PaymentStatus,
};
use crate::domain::ports::{
    ChangeSet, CheckoutEventKind, CheckoutPurpose, CheckoutSession, EscrowStore, EscrowStoreBox,
    PaymentGateway, PaymentGatewayBox, Sequence, WriteOp,
};
use crate::domain::review::Review;
use crate::domain::user::{Actor, User};
use crate::domain::withdrawal::{Withdrawal, WithdrawalStatus};
use crate::domain::{DisputeId, GigId, MilestoneId, OrderId, WithdrawalId};
use crate::error::{MarketError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, error, info, warn};

const DEFAULT_COMMISSION_RATE: Decimal = dec!(0.05);
const MIN_TOPUP: Decimal = dec!(5.00);
const MAX_TOPUP: Decimal = dec!(10000.00);

/// The order lifecycle and escrow settlement engine.
///
/// Every public operation is safe to call from concurrent request handlers:
/// it acquires the row locks for whatever it will read-check-write, rebuilds
/// its view of those rows under the locks, and commits all resulting writes
/// as one atomic `ChangeSet`. Gateway calls happen outside any lock.
pub struct EscrowEngine {
    store: EscrowStoreBox,
    gateway: PaymentGatewayBox,
    locks: RowLocks,
    commission_rate: Decimal,
}

impl EscrowEngine {
    pub fn new(store: EscrowStoreBox, gateway: PaymentGatewayBox) -> Self {
        Self::with_commission_rate(store, gateway, DEFAULT_COMMISSION_RATE)
    }

    pub fn with_commission_rate(
        store: EscrowStoreBox,
        gateway: PaymentGatewayBox,
        commission_rate: Decimal,
    ) -> Self {
        Self {
            store,
            gateway,
            locks: RowLocks::new(),
            commission_rate,
        }
    }

    /// Creates an order in `pending` for one of the gig's price tiers. The
    /// escrow ledger is not involved until payment.
    pub async fn create_order(
        &self,
        actor: &Actor,
        gig_id: GigId,
        tier: PackageTier,
    ) -> Result<Order> {
        if !actor.role.can_buy() {
            return Err(MarketError::Forbidden(
                "only buyers can create orders".to_string(),
            ));
        }
        let gig = self
            .store
            .gig(gig_id)
            .await?
            .ok_or_else(|| MarketError::not_found("gig", gig_id))?;
        if gig.seller_id == actor.id {
            return Err(MarketError::Validation(
                "cannot order your own gig".to_string(),
            ));
        }

        let amount = gig.price_for(tier);
        let commission = (amount.value() * self.commission_rate).round_dp(2);
        let now = Utc::now();
        let order = Order {
            id: self.store.next_id(Sequence::Order).await?,
            buyer_id: actor.id,
            seller_id: gig.seller_id,
            gig_id: gig.id,
            amount,
            commission,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.commit(WriteOp::PutOrder(order.clone()).into()).await?;
        info!(order = order.id, buyer = actor.id, %amount, "order created");
        Ok(order)
    }

    /// Asks the gateway for a hosted checkout covering the order amount.
    /// Persists nothing; the session resolves later through the webhook.
    pub async fn create_checkout_session(
        &self,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<CheckoutSession> {
        let order = self.load_order(order_id).await?;
        if order.buyer_id != actor.id {
            return Err(MarketError::Forbidden(
                "only the order's buyer can pay for it".to_string(),
            ));
        }
        if order.status != OrderStatus::Pending {
            return Err(MarketError::Validation("order cannot be paid".to_string()));
        }
        self.gateway
            .create_checkout(
                order.amount,
                DEFAULT_CURRENCY,
                CheckoutPurpose::OrderPayment { order_id },
            )
            .await
    }

    /// Hosted checkout for a wallet top-up, bounded to the allowed range.
    pub async fn wallet_topup_session(
        &self,
        actor: &Actor,
        amount: Amount,
    ) -> Result<CheckoutSession> {
        if amount.value() < MIN_TOPUP {
            return Err(MarketError::Validation(format!(
                "minimum top-up amount is {MIN_TOPUP}"
            )));
        }
        if amount.value() > MAX_TOPUP {
            return Err(MarketError::Validation(format!(
                "maximum top-up amount is {MAX_TOPUP}"
            )));
        }
        self.gateway
            .create_checkout(
                amount,
                DEFAULT_CURRENCY,
                CheckoutPurpose::WalletTopUp {
                    user_id: actor.id,
                    amount,
                },
            )
            .await
    }

    /// Pays a pending order synchronously from the buyer's wallet: debit,
    /// `pending -> active`, and the payment record commit together.
    pub async fn pay_with_wallet(&self, actor: &Actor, order_id: OrderId) -> Result<Payment> {
        let _guards = self
            .locks
            .acquire(vec![RowKey::Order(order_id), RowKey::User(actor.id)])
            .await;

        let mut order = self.load_order(order_id).await?;
        if order.buyer_id != actor.id {
            return Err(MarketError::Forbidden(
                "only the order's buyer can pay for it".to_string(),
            ));
        }
        if order.status != OrderStatus::Pending {
            return Err(MarketError::Validation("order cannot be paid".to_string()));
        }

        let mut buyer = self.load_user(actor.id).await?;
        ensure_not_suspended(&buyer)?;
        buyer.debit(order.amount)?;
        let now = Utc::now();
        order.attempt_transition(Requester::System, OrderStatus::Active, now)?;

        let payment = Payment {
            reference: format!("wallet-order-{order_id}"),
            user_id: actor.id,
            order_id: Some(order_id),
            amount: order.amount,
            currency: DEFAULT_CURRENCY.to_string(),
            provider: PaymentProvider::Wallet,
            kind: PaymentKind::OrderCharge,
            status: PaymentStatus::Completed,
            created_at: now,
        };

        let mut changes = ChangeSet::new();
        changes.push(WriteOp::PutUser(buyer));
        changes.push(WriteOp::PutOrder(order));
        changes.push(WriteOp::PutPayment(payment.clone()));
        self.commit(changes).await?;
        info!(order = order_id, buyer = actor.id, "order paid from wallet");
        Ok(payment)
    }

    /// Applies a verified external event. Idempotent and commutative with
    /// respect to duplicate, reordered, or late deliveries: every path that
    /// finds the event already applied (or inapplicable) returns `Ok` so the
    /// provider stops retrying.
    pub async fn handle_webhook(&self, raw_body: &[u8], signature: &str) -> Result<()> {
        let event = self.gateway.verify_and_decode(raw_body, signature)?;
        match event.kind {
            CheckoutEventKind::OrderPaid { order_id } => {
                let _guards = self
                    .locks
                    .acquire(vec![
                        RowKey::Event(event.reference.clone()),
                        RowKey::Order(order_id),
                    ])
                    .await;

                if self.store.payment(&event.reference).await?.is_some() {
                    debug!(reference = %event.reference, "duplicate event, already applied");
                    return Ok(());
                }
                let Some(mut order) = self.store.order(order_id).await? else {
                    warn!(reference = %event.reference, order = order_id, "event for unknown order");
                    return Ok(());
                };
                if order.status != OrderStatus::Pending {
                    debug!(
                        reference = %event.reference,
                        order = order_id,
                        status = %order.status,
                        "late event, order already settled"
                    );
                    return Ok(());
                }

                let now = Utc::now();
                order.attempt_transition(Requester::System, OrderStatus::Active, now)?;
                let payment = Payment {
                    reference: event.reference.clone(),
                    user_id: order.buyer_id,
                    order_id: Some(order_id),
                    amount: order.amount,
                    currency: DEFAULT_CURRENCY.to_string(),
                    provider: PaymentProvider::External,
                    kind: PaymentKind::OrderCharge,
                    status: PaymentStatus::Completed,
                    created_at: now,
                };
                let mut changes = ChangeSet::new();
                changes.push(WriteOp::PutOrder(order));
                changes.push(WriteOp::PutPayment(payment));
                self.commit(changes).await?;
                info!(reference = %event.reference, order = order_id, "order activated by webhook");
                Ok(())
            }
            CheckoutEventKind::WalletTopUp { user_id, amount } => {
                let _guards = self
                    .locks
                    .acquire(vec![
                        RowKey::Event(event.reference.clone()),
                        RowKey::User(user_id),
                    ])
                    .await;

                if self.store.payment(&event.reference).await?.is_some() {
                    debug!(reference = %event.reference, "duplicate event, already applied");
                    return Ok(());
                }
                let Some(mut user) = self.store.user(user_id).await? else {
                    warn!(reference = %event.reference, user = user_id, "top-up for unknown user");
                    return Ok(());
                };

                user.credit(amount);
                let payment = Payment {
                    reference: event.reference.clone(),
                    user_id,
                    order_id: None,
                    amount,
                    currency: DEFAULT_CURRENCY.to_string(),
                    provider: PaymentProvider::External,
                    kind: PaymentKind::WalletTopUp,
                    status: PaymentStatus::Completed,
                    created_at: Utc::now(),
                };
                let mut changes = ChangeSet::new();
                changes.push(WriteOp::PutUser(user));
                changes.push(WriteOp::PutPayment(payment));
                self.commit(changes).await?;
                info!(reference = %event.reference, user = user_id, %amount, "wallet topped up");
                Ok(())
            }
            CheckoutEventKind::Ignored => {
                debug!(reference = %event.reference, "ignoring uninteresting event type");
                Ok(())
            }
        }
    }

    /// Applies a user-requested status transition, then settles escrow if
    /// the order just became terminal.
    pub async fn request_transition(
        &self,
        actor: &Actor,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order> {
        let participants = self.load_order(order_id).await?;
        let _guards = self
            .locks
            .acquire(vec![
                RowKey::Order(order_id),
                RowKey::User(participants.buyer_id),
                RowKey::User(participants.seller_id),
            ])
            .await;

        let mut order = self.load_order(order_id).await?;
        let requester = self.requester_for(actor, &order)?;
        order.attempt_transition(requester, new_status, Utc::now())?;

        let mut changes = ChangeSet::new();
        changes.push(WriteOp::PutOrder(order.clone()));
        self.settlement_ops(&order, &mut changes).await?;
        self.commit(changes).await?;
        info!(order = order_id, actor = actor.id, status = %new_status, "order transitioned");
        Ok(order)
    }

    /// Adds a milestone to a pending or active order. The running milestone
    /// budget may not exceed the order amount.
    pub async fn create_milestone(
        &self,
        actor: &Actor,
        order_id: OrderId,
        draft: MilestoneDraft,
    ) -> Result<Milestone> {
        if draft.title.trim().is_empty() {
            return Err(MarketError::Validation("title is required".to_string()));
        }
        let _guards = self.locks.acquire(vec![RowKey::Order(order_id)]).await;

        let order = self.load_order(order_id).await?;
        self.require_seller(actor, &order)?;
        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Active) {
            return Err(MarketError::Validation(format!(
                "milestones cannot be added to a {} order",
                order.status
            )));
        }

        let budgeted: Decimal = self
            .store
            .milestones_for_order(order_id)
            .await?
            .iter()
            .map(|m| m.amount.value())
            .sum::<Decimal>()
            + draft.amount.value();
        if budgeted > order.amount.value() {
            return Err(MarketError::MilestoneBudgetExceeded {
                budgeted,
                order_amount: order.amount.value(),
            });
        }

        let milestone = Milestone {
            id: self.store.next_id(Sequence::Milestone).await?,
            order_id,
            title: draft.title,
            description: draft.description,
            amount: draft.amount,
            status: MilestoneStatus::Pending,
            due_date: draft.due_date,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.commit(WriteOp::PutMilestone(milestone.clone()).into())
            .await?;
        info!(order = order_id, milestone = milestone.id, "milestone created");
        Ok(milestone)
    }

    /// Marks a milestone completed. Rejected while the order is disputed
    /// (dispute freezes milestone mutation) or terminal.
    pub async fn complete_milestone(
        &self,
        actor: &Actor,
        order_id: OrderId,
        milestone_id: MilestoneId,
    ) -> Result<Milestone> {
        let _guards = self.locks.acquire(vec![RowKey::Order(order_id)]).await;

        let order = self.load_order(order_id).await?;
        self.require_seller(actor, &order)?;
        if order.status == OrderStatus::Disputed {
            return Err(MarketError::Validation(
                "milestones are frozen while the order is disputed".to_string(),
            ));
        }
        if !matches!(order.status, OrderStatus::Active | OrderStatus::Delivered) {
            return Err(MarketError::Validation(format!(
                "milestones cannot be completed on a {} order",
                order.status
            )));
        }

        let mut milestone = self
            .store
            .milestone(milestone_id)
            .await?
            .filter(|m| m.order_id == order_id)
            .ok_or_else(|| MarketError::not_found("milestone", milestone_id))?;
        milestone.mark_completed(Utc::now())?;
        self.commit(WriteOp::PutMilestone(milestone.clone()).into())
            .await?;
        info!(order = order_id, milestone = milestone_id, "milestone completed");
        Ok(milestone)
    }

    /// Raises a dispute: buyer only. Moves the order to `disputed` through
    /// the state machine and records the dispute in the same commit.
    pub async fn raise_dispute(
        &self,
        actor: &Actor,
        order_id: OrderId,
        reason: impl Into<String>,
    ) -> Result<Dispute> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(MarketError::Validation(
                "a reason is required to raise a dispute".to_string(),
            ));
        }
        let _guards = self.locks.acquire(vec![RowKey::Order(order_id)]).await;

        let mut order = self.load_order(order_id).await?;
        if order.buyer_id != actor.id {
            return Err(MarketError::Forbidden(
                "only the buyer may raise a dispute".to_string(),
            ));
        }
        let now = Utc::now();
        order.attempt_transition(Requester::Buyer, OrderStatus::Disputed, now)?;

        let dispute = Dispute {
            id: self.store.next_id(Sequence::Dispute).await?,
            order_id,
            raised_by: actor.id,
            reason,
            status: DisputeStatus::Open,
            outcome: None,
            resolution_notes: None,
            created_at: now,
            resolved_at: None,
        };
        let mut changes = ChangeSet::new();
        changes.push(WriteOp::PutOrder(order));
        changes.push(WriteOp::PutDispute(dispute.clone()));
        self.commit(changes).await?;
        info!(order = order_id, dispute = dispute.id, "dispute raised");
        Ok(dispute)
    }

    /// Resolves a dispute (admin only). The dispute fields, the terminal
    /// order transition and the fund redirection commit atomically together.
    pub async fn resolve_dispute(
        &self,
        actor: &Actor,
        dispute_id: DisputeId,
        outcome: DisputeOutcome,
        notes: impl Into<String>,
    ) -> Result<Dispute> {
        if !actor.role.is_admin() {
            return Err(MarketError::Forbidden(
                "only an admin may resolve disputes".to_string(),
            ));
        }
        let placed = self
            .store
            .dispute(dispute_id)
            .await?
            .ok_or_else(|| MarketError::not_found("dispute", dispute_id))?;
        let participants = self.load_order(placed.order_id).await?;
        let _guards = self
            .locks
            .acquire(vec![
                RowKey::Order(participants.id),
                RowKey::User(participants.buyer_id),
                RowKey::User(participants.seller_id),
            ])
            .await;

        let mut dispute = self
            .store
            .dispute(dispute_id)
            .await?
            .ok_or_else(|| MarketError::not_found("dispute", dispute_id))?;
        let mut order = self.load_order(dispute.order_id).await?;

        let now = Utc::now();
        dispute.resolve(outcome, notes, now)?;
        let target = match outcome {
            DisputeOutcome::FavorBuyer => OrderStatus::Cancelled,
            DisputeOutcome::FavorSeller => OrderStatus::Completed,
        };
        order.attempt_transition(Requester::System, target, now)?;

        let mut changes = ChangeSet::new();
        changes.push(WriteOp::PutOrder(order.clone()));
        changes.push(WriteOp::PutDispute(dispute.clone()));
        self.settlement_ops(&order, &mut changes).await?;
        self.commit(changes).await?;
        info!(dispute = dispute_id, order = order.id, ?outcome, "dispute resolved");
        Ok(dispute)
    }

    /// Records a withdrawal request. The balance is only pre-checked here;
    /// the debit happens on approval.
    pub async fn request_withdrawal(&self, actor: &Actor, amount: Amount) -> Result<Withdrawal> {
        let _guards = self.locks.acquire(vec![RowKey::User(actor.id)]).await;

        let user = self.load_user(actor.id).await?;
        ensure_not_suspended(&user)?;
        if !user.wallet_balance.covers(amount) {
            return Err(MarketError::InsufficientFunds);
        }
        let withdrawal = Withdrawal {
            id: self.store.next_id(Sequence::Withdrawal).await?,
            user_id: actor.id,
            amount,
            status: WithdrawalStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
        };
        self.commit(WriteOp::PutWithdrawal(withdrawal.clone()).into())
            .await?;
        info!(user = actor.id, %amount, "withdrawal requested");
        Ok(withdrawal)
    }

    /// Approves a pending withdrawal (admin only), debiting the wallet. The
    /// balance is re-checked under the user's row lock because it may have
    /// dropped since the request.
    pub async fn approve_withdrawal(
        &self,
        actor: &Actor,
        withdrawal_id: WithdrawalId,
    ) -> Result<Withdrawal> {
        if !actor.role.is_admin() {
            return Err(MarketError::Forbidden(
                "only an admin may decide withdrawals".to_string(),
            ));
        }
        let placed = self
            .store
            .withdrawal(withdrawal_id)
            .await?
            .ok_or_else(|| MarketError::not_found("withdrawal", withdrawal_id))?;
        let _guards = self
            .locks
            .acquire(vec![
                RowKey::Withdrawal(withdrawal_id),
                RowKey::User(placed.user_id),
            ])
            .await;

        let mut withdrawal = self
            .store
            .withdrawal(withdrawal_id)
            .await?
            .ok_or_else(|| MarketError::not_found("withdrawal", withdrawal_id))?;
        let now = Utc::now();
        withdrawal.decide(WithdrawalStatus::Approved, now)?;
        let mut user = self.load_user(withdrawal.user_id).await?;
        user.debit(withdrawal.amount)?;

        let mut changes = ChangeSet::new();
        changes.push(WriteOp::PutUser(user));
        changes.push(WriteOp::PutWithdrawal(withdrawal.clone()));
        self.commit(changes).await?;
        info!(withdrawal = withdrawal_id, user = withdrawal.user_id, "withdrawal approved");
        Ok(withdrawal)
    }

    /// Rejects a pending withdrawal (admin only). No ledger effect.
    pub async fn reject_withdrawal(
        &self,
        actor: &Actor,
        withdrawal_id: WithdrawalId,
    ) -> Result<Withdrawal> {
        if !actor.role.is_admin() {
            return Err(MarketError::Forbidden(
                "only an admin may decide withdrawals".to_string(),
            ));
        }
        let _guards = self
            .locks
            .acquire(vec![RowKey::Withdrawal(withdrawal_id)])
            .await;

        let mut withdrawal = self
            .store
            .withdrawal(withdrawal_id)
            .await?
            .ok_or_else(|| MarketError::not_found("withdrawal", withdrawal_id))?;
        withdrawal.decide(WithdrawalStatus::Rejected, Utc::now())?;
        self.commit(WriteOp::PutWithdrawal(withdrawal.clone()).into())
            .await?;
        info!(withdrawal = withdrawal_id, "withdrawal rejected");
        Ok(withdrawal)
    }

    /// Leaves a review on a completed order. One per participant.
    pub async fn leave_review(
        &self,
        actor: &Actor,
        order_id: OrderId,
        rating: u8,
        comment: impl Into<String>,
    ) -> Result<Review> {
        Review::validate_rating(rating)?;
        let _guards = self.locks.acquire(vec![RowKey::Order(order_id)]).await;

        let order = self.load_order(order_id).await?;
        if actor.id != order.buyer_id && actor.id != order.seller_id {
            return Err(MarketError::Forbidden(
                "only order participants may leave reviews".to_string(),
            ));
        }
        if order.status != OrderStatus::Completed {
            return Err(MarketError::Validation(
                "only completed orders can be reviewed".to_string(),
            ));
        }
        if self.store.review_for(order_id, actor.id).await?.is_some() {
            return Err(MarketError::Validation(
                "you have already reviewed this order".to_string(),
            ));
        }

        let reviewed = if actor.id == order.buyer_id {
            order.seller_id
        } else {
            order.buyer_id
        };
        let review = Review {
            id: self.store.next_id(Sequence::Review).await?,
            order_id,
            reviewer_id: actor.id,
            seller_id: reviewed,
            rating,
            comment: comment.into(),
            created_at: Utc::now(),
        };
        self.commit(WriteOp::PutReview(review.clone()).into())
            .await?;
        Ok(review)
    }

    fn requester_for(&self, actor: &Actor, order: &Order) -> Result<Requester> {
        if actor.role.is_admin() {
            Ok(Requester::Admin)
        } else if actor.id == order.buyer_id {
            Ok(Requester::Buyer)
        } else if actor.id == order.seller_id {
            Ok(Requester::Seller)
        } else {
            Err(MarketError::Forbidden(
                "not a participant in this order".to_string(),
            ))
        }
    }

    fn require_seller(&self, actor: &Actor, order: &Order) -> Result<()> {
        if actor.id == order.seller_id || actor.role.is_admin() {
            Ok(())
        } else {
            Err(MarketError::Forbidden(
                "only the order's seller may manage milestones".to_string(),
            ))
        }
    }

    async fn load_order(&self, id: OrderId) -> Result<Order> {
        self.store
            .order(id)
            .await?
            .ok_or_else(|| MarketError::not_found("order", id))
    }

    async fn load_user(&self, id: u64) -> Result<User> {
        self.store
            .user(id)
            .await?
            .ok_or_else(|| MarketError::not_found("user", id))
    }

    /// The effective completed charge covering the order, if any.
    async fn completed_charge(&self, order_id: OrderId) -> Result<Option<Payment>> {
        Ok(self
            .store
            .payments_for_order(order_id)
            .await?
            .into_iter()
            .find(|p| p.kind == PaymentKind::OrderCharge && p.is_completed()))
    }

    /// Escrow release for an order that just went terminal: seller payout on
    /// `completed`, buyer refund on `cancelled`. Orders that were never paid
    /// move no funds. The deterministic references make a repeat application
    /// a no-op even if a terminal transition were ever replayed.
    async fn settlement_ops(&self, order: &Order, changes: &mut ChangeSet) -> Result<()> {
        if self.completed_charge(order.id).await?.is_none() {
            return Ok(());
        }
        let now = Utc::now();
        match order.status {
            OrderStatus::Completed => {
                let reference = format!("payout-order-{}", order.id);
                if self.store.payment(&reference).await?.is_some() {
                    return Ok(());
                }
                let amount = order.payout_amount()?;
                let mut seller = self.load_user(order.seller_id).await?;
                seller.credit(amount);
                changes.push(WriteOp::PutUser(seller));
                changes.push(WriteOp::PutPayment(Payment {
                    reference,
                    user_id: order.seller_id,
                    order_id: Some(order.id),
                    amount,
                    currency: DEFAULT_CURRENCY.to_string(),
                    provider: PaymentProvider::Wallet,
                    kind: PaymentKind::SellerPayout,
                    status: PaymentStatus::Completed,
                    created_at: now,
                }));
                info!(order = order.id, seller = order.seller_id, %amount, "escrow released to seller");
            }
            OrderStatus::Cancelled => {
                let reference = format!("refund-order-{}", order.id);
                if self.store.payment(&reference).await?.is_some() {
                    return Ok(());
                }
                let mut buyer = self.load_user(order.buyer_id).await?;
                buyer.credit(order.amount);
                changes.push(WriteOp::PutUser(buyer));
                changes.push(WriteOp::PutPayment(Payment {
                    reference,
                    user_id: order.buyer_id,
                    order_id: Some(order.id),
                    amount: order.amount,
                    currency: DEFAULT_CURRENCY.to_string(),
                    provider: PaymentProvider::Wallet,
                    kind: PaymentKind::BuyerRefund,
                    status: PaymentStatus::Completed,
                    created_at: now,
                }));
                info!(order = order.id, buyer = order.buyer_id, "escrow refunded to buyer");
            }
            _ => {}
        }
        Ok(())
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        if let Err(err) = self.store.commit(changes).await {
            error!(%err, "atomic commit failed after checks passed");
            return Err(err.into());
        }
        Ok(())
    }
}

// Suspension blocks a user from spending their own funds. It never blocks
// settlement credits, or escrow could be stranded.
fn ensure_not_suspended(user: &User) -> Result<()> {
    if user.suspended {
        Err(MarketError::Forbidden("account is suspended".to_string()))
    } else {
        Ok(())
    }
}
