use crate::domain::dispute::Dispute;
use crate::domain::gig::Gig;
use crate::domain::milestone::Milestone;
use crate::domain::money::Amount;
use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::domain::review::Review;
use crate::domain::user::User;
use crate::domain::withdrawal::Withdrawal;
use crate::domain::{DisputeId, GigId, MilestoneId, OrderId, UserId, WithdrawalId};
use crate::error::{MarketError, StorageError};
use async_trait::async_trait;

/// Id sequences the store allocates from. Users and gigs arrive with ids
/// from the surrounding application and need no sequence here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sequence {
    Order,
    Milestone,
    Dispute,
    Withdrawal,
    Review,
}

/// One row write. `ChangeSet`s group the writes of a logical operation so the
/// store can apply them atomically.
#[derive(Debug, Clone)]
pub enum WriteOp {
    PutUser(User),
    PutGig(Gig),
    PutOrder(Order),
    PutPayment(Payment),
    PutMilestone(Milestone),
    PutDispute(Dispute),
    PutWithdrawal(Withdrawal),
    PutReview(Review),
}

#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub ops: Vec<WriteOp>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }
}

impl From<WriteOp> for ChangeSet {
    fn from(op: WriteOp) -> Self {
        Self { ops: vec![op] }
    }
}

/// Transactional storage for the engine's rows.
///
/// Reads are point lookups plus the few scans the engine needs; all writes go
/// through `commit`, which must apply the whole `ChangeSet` atomically —
/// either every row lands or none does. Row-level mutual exclusion is the
/// caller's job (the engine's `RowLocks`); the store only guarantees commit
/// atomicity and read consistency.
#[async_trait]
pub trait EscrowStore: Send + Sync {
    async fn user(&self, id: UserId) -> Result<Option<User>, StorageError>;
    async fn users(&self) -> Result<Vec<User>, StorageError>;
    async fn gig(&self, id: GigId) -> Result<Option<Gig>, StorageError>;
    async fn order(&self, id: OrderId) -> Result<Option<Order>, StorageError>;
    /// Lookup by idempotency key.
    async fn payment(&self, reference: &str) -> Result<Option<Payment>, StorageError>;
    async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, StorageError>;
    async fn payments(&self) -> Result<Vec<Payment>, StorageError>;
    async fn milestone(&self, id: MilestoneId) -> Result<Option<Milestone>, StorageError>;
    async fn milestones_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<Milestone>, StorageError>;
    async fn dispute(&self, id: DisputeId) -> Result<Option<Dispute>, StorageError>;
    async fn withdrawal(&self, id: WithdrawalId) -> Result<Option<Withdrawal>, StorageError>;
    async fn withdrawals(&self) -> Result<Vec<Withdrawal>, StorageError>;
    async fn review_for(
        &self,
        order_id: OrderId,
        reviewer_id: UserId,
    ) -> Result<Option<Review>, StorageError>;

    async fn next_id(&self, sequence: Sequence) -> Result<u64, StorageError>;

    /// Atomically applies every write in the change set.
    async fn commit(&self, changes: ChangeSet) -> Result<(), StorageError>;
}

pub type EscrowStoreBox = Box<dyn EscrowStore>;

/// A hosted checkout created at the external processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// What a checkout session is for; round-trips through the processor as
/// session metadata and comes back in the webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutPurpose {
    OrderPayment { order_id: OrderId },
    WalletTopUp { user_id: UserId, amount: Amount },
}

/// A verified, decoded webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutEvent {
    /// The processor's event id — the idempotency key.
    pub reference: String,
    pub kind: CheckoutEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutEventKind {
    OrderPaid { order_id: OrderId },
    WalletTopUp { user_id: UserId, amount: Amount },
    /// Recognized signature, uninteresting event type. Acknowledged without
    /// side effects.
    Ignored,
}

/// The external card-payment processor, reduced to the two calls the engine
/// needs. Implementations wrap a concrete provider SDK; the bundled
/// `HmacGateway` stands in for one in tests and the replay CLI.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(
        &self,
        amount: Amount,
        currency: &str,
        purpose: CheckoutPurpose,
    ) -> Result<CheckoutSession, MarketError>;

    /// Verifies the signature over the raw body and decodes the payload.
    /// Must not be called while holding row locks.
    fn verify_and_decode(
        &self,
        raw_body: &[u8],
        signature: &str,
    ) -> Result<CheckoutEvent, MarketError>;
}

pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
