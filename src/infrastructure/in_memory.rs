use crate::domain::dispute::Dispute;
use crate::domain::gig::Gig;
use crate::domain::milestone::Milestone;
use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::domain::ports::{ChangeSet, EscrowStore, Sequence, WriteOp};
use crate::domain::review::Review;
use crate::domain::user::User;
use crate::domain::withdrawal::Withdrawal;
use crate::domain::{DisputeId, GigId, MilestoneId, OrderId, UserId, WithdrawalId};
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    gigs: HashMap<GigId, Gig>,
    orders: HashMap<OrderId, Order>,
    payments: HashMap<String, Payment>,
    milestones: HashMap<MilestoneId, Milestone>,
    disputes: HashMap<DisputeId, Dispute>,
    withdrawals: HashMap<WithdrawalId, Withdrawal>,
    reviews: HashMap<(OrderId, UserId), Review>,
    sequences: HashMap<Sequence, u64>,
}

/// Thread-safe in-memory store.
///
/// All rows live behind one `Arc<RwLock<State>>`, so applying a `ChangeSet`
/// under the write guard is atomic by construction. `Clone` shares the
/// underlying state, which lets callers keep a handle for reads after boxing
/// a copy into the engine.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EscrowStore for InMemoryStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn users(&self) -> Result<Vec<User>, StorageError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn gig(&self, id: GigId) -> Result<Option<Gig>, StorageError> {
        Ok(self.state.read().await.gigs.get(&id).cloned())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StorageError> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn payment(&self, reference: &str) -> Result<Option<Payment>, StorageError> {
        Ok(self.state.read().await.payments.get(reference).cloned())
    }

    async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, StorageError> {
        let state = self.state.read().await;
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.order_id == Some(order_id))
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn payments(&self) -> Result<Vec<Payment>, StorageError> {
        let state = self.state.read().await;
        let mut payments: Vec<Payment> = state.payments.values().cloned().collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn milestone(&self, id: MilestoneId) -> Result<Option<Milestone>, StorageError> {
        Ok(self.state.read().await.milestones.get(&id).cloned())
    }

    async fn milestones_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<Milestone>, StorageError> {
        let state = self.state.read().await;
        let mut milestones: Vec<Milestone> = state
            .milestones
            .values()
            .filter(|m| m.order_id == order_id)
            .cloned()
            .collect();
        milestones.sort_by_key(|m| m.id);
        Ok(milestones)
    }

    async fn dispute(&self, id: DisputeId) -> Result<Option<Dispute>, StorageError> {
        Ok(self.state.read().await.disputes.get(&id).cloned())
    }

    async fn withdrawal(&self, id: WithdrawalId) -> Result<Option<Withdrawal>, StorageError> {
        Ok(self.state.read().await.withdrawals.get(&id).cloned())
    }

    async fn withdrawals(&self) -> Result<Vec<Withdrawal>, StorageError> {
        let state = self.state.read().await;
        let mut withdrawals: Vec<Withdrawal> = state.withdrawals.values().cloned().collect();
        withdrawals.sort_by_key(|w| w.id);
        Ok(withdrawals)
    }

    async fn review_for(
        &self,
        order_id: OrderId,
        reviewer_id: UserId,
    ) -> Result<Option<Review>, StorageError> {
        Ok(self
            .state
            .read()
            .await
            .reviews
            .get(&(order_id, reviewer_id))
            .cloned())
    }

    async fn next_id(&self, sequence: Sequence) -> Result<u64, StorageError> {
        let mut state = self.state.write().await;
        let counter = state.sequences.entry(sequence).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        for op in changes.ops {
            match op {
                WriteOp::PutUser(user) => {
                    state.users.insert(user.id, user);
                }
                WriteOp::PutGig(gig) => {
                    state.gigs.insert(gig.id, gig);
                }
                WriteOp::PutOrder(order) => {
                    state.orders.insert(order.id, order);
                }
                WriteOp::PutPayment(payment) => {
                    state.payments.insert(payment.reference.clone(), payment);
                }
                WriteOp::PutMilestone(milestone) => {
                    state.milestones.insert(milestone.id, milestone);
                }
                WriteOp::PutDispute(dispute) => {
                    state.disputes.insert(dispute.id, dispute);
                }
                WriteOp::PutWithdrawal(withdrawal) => {
                    state.withdrawals.insert(withdrawal.id, withdrawal);
                }
                WriteOp::PutReview(review) => {
                    state
                        .reviews
                        .insert((review.order_id, review.reviewer_id), review);
                }
            }
        }
        Ok(())
    }
}
