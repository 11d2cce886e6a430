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
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CF_USERS: &str = "users";
pub const CF_GIGS: &str = "gigs";
pub const CF_ORDERS: &str = "orders";
pub const CF_PAYMENTS: &str = "payments";
pub const CF_MILESTONES: &str = "milestones";
pub const CF_DISPUTES: &str = "disputes";
pub const CF_WITHDRAWALS: &str = "withdrawals";
pub const CF_REVIEWS: &str = "reviews";
pub const CF_SEQUENCES: &str = "sequences";

const ALL_CFS: &[&str] = &[
    CF_USERS,
    CF_GIGS,
    CF_ORDERS,
    CF_PAYMENTS,
    CF_MILESTONES,
    CF_DISPUTES,
    CF_WITHDRAWALS,
    CF_REVIEWS,
    CF_SEQUENCES,
];

fn sequence_key(sequence: Sequence) -> &'static [u8] {
    match sequence {
        Sequence::Order => b"order",
        Sequence::Milestone => b"milestone",
        Sequence::Dispute => b"dispute",
        Sequence::Withdrawal => b"withdrawal",
        Sequence::Review => b"review",
    }
}

fn review_key(order_id: OrderId, reviewer_id: UserId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&order_id.to_be_bytes());
    key[8..].copy_from_slice(&reviewer_id.to_be_bytes());
    key
}

/// Persistent store on RocksDB, one column family per entity.
///
/// Every `ChangeSet` is applied through a single `rocksdb::WriteBatch`, so a
/// logical operation's rows land atomically or not at all. `Clone` shares the
/// underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    // Serializes read-increment-write of the id counters.
    sequence_guard: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates the database, ensuring every column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
        Ok(Self {
            db: Arc::new(db),
            sequence_guard: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::Other(format!("column family {name} not found")))
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>, StorageError> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>, StorageError> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    fn batch_put<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        key: &[u8],
        row: &T,
    ) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(cf, key, serde_json::to_vec(row)?);
        Ok(())
    }
}

#[async_trait]
impl EscrowStore for RocksDbStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        self.get_json(CF_USERS, &id.to_be_bytes())
    }

    async fn users(&self) -> Result<Vec<User>, StorageError> {
        // Big-endian keys keep the scan id-ordered.
        self.scan_json(CF_USERS)
    }

    async fn gig(&self, id: GigId) -> Result<Option<Gig>, StorageError> {
        self.get_json(CF_GIGS, &id.to_be_bytes())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StorageError> {
        self.get_json(CF_ORDERS, &id.to_be_bytes())
    }

    async fn payment(&self, reference: &str) -> Result<Option<Payment>, StorageError> {
        self.get_json(CF_PAYMENTS, reference.as_bytes())
    }

    async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, StorageError> {
        let mut payments: Vec<Payment> = self
            .scan_json::<Payment>(CF_PAYMENTS)?
            .into_iter()
            .filter(|p| p.order_id == Some(order_id))
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn payments(&self) -> Result<Vec<Payment>, StorageError> {
        let mut payments: Vec<Payment> = self.scan_json(CF_PAYMENTS)?;
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn milestone(&self, id: MilestoneId) -> Result<Option<Milestone>, StorageError> {
        self.get_json(CF_MILESTONES, &id.to_be_bytes())
    }

    async fn milestones_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<Milestone>, StorageError> {
        let mut milestones: Vec<Milestone> = self
            .scan_json::<Milestone>(CF_MILESTONES)?
            .into_iter()
            .filter(|m| m.order_id == order_id)
            .collect();
        milestones.sort_by_key(|m| m.id);
        Ok(milestones)
    }

    async fn dispute(&self, id: DisputeId) -> Result<Option<Dispute>, StorageError> {
        self.get_json(CF_DISPUTES, &id.to_be_bytes())
    }

    async fn withdrawal(&self, id: WithdrawalId) -> Result<Option<Withdrawal>, StorageError> {
        self.get_json(CF_WITHDRAWALS, &id.to_be_bytes())
    }

    async fn withdrawals(&self) -> Result<Vec<Withdrawal>, StorageError> {
        self.scan_json(CF_WITHDRAWALS)
    }

    async fn review_for(
        &self,
        order_id: OrderId,
        reviewer_id: UserId,
    ) -> Result<Option<Review>, StorageError> {
        self.get_json(CF_REVIEWS, &review_key(order_id, reviewer_id))
    }

    async fn next_id(&self, sequence: Sequence) -> Result<u64, StorageError> {
        let _guard = self.sequence_guard.lock().await;
        let cf = self.cf(CF_SEQUENCES)?;
        let key = sequence_key(sequence);
        let current = match self.db.get_cf(cf, key)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StorageError::Other("corrupt sequence counter".to_string()))?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.db.put_cf(cf, key, next.to_be_bytes())?;
        Ok(next)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), StorageError> {
        let mut batch = WriteBatch::default();
        for op in &changes.ops {
            match op {
                WriteOp::PutUser(user) => {
                    self.batch_put(&mut batch, CF_USERS, &user.id.to_be_bytes(), user)?;
                }
                WriteOp::PutGig(gig) => {
                    self.batch_put(&mut batch, CF_GIGS, &gig.id.to_be_bytes(), gig)?;
                }
                WriteOp::PutOrder(order) => {
                    self.batch_put(&mut batch, CF_ORDERS, &order.id.to_be_bytes(), order)?;
                }
                WriteOp::PutPayment(payment) => {
                    self.batch_put(
                        &mut batch,
                        CF_PAYMENTS,
                        payment.reference.as_bytes(),
                        payment,
                    )?;
                }
                WriteOp::PutMilestone(milestone) => {
                    self.batch_put(
                        &mut batch,
                        CF_MILESTONES,
                        &milestone.id.to_be_bytes(),
                        milestone,
                    )?;
                }
                WriteOp::PutDispute(dispute) => {
                    self.batch_put(&mut batch, CF_DISPUTES, &dispute.id.to_be_bytes(), dispute)?;
                }
                WriteOp::PutWithdrawal(withdrawal) => {
                    self.batch_put(
                        &mut batch,
                        CF_WITHDRAWALS,
                        &withdrawal.id.to_be_bytes(),
                        withdrawal,
                    )?;
                }
                WriteOp::PutReview(review) => {
                    self.batch_put(
                        &mut batch,
                        CF_REVIEWS,
                        &review_key(review.order_id, review.reviewer_id),
                        review,
                    )?;
                }
            }
        }
        self.db.write(batch)?;
        Ok(())
    }
}
