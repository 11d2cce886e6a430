use crate::application::engine::EscrowEngine;
use crate::domain::dispute::DisputeOutcome;
use crate::domain::gig::{Gig, PackageTier};
use crate::domain::milestone::MilestoneDraft;
use crate::domain::money::Amount;
use crate::domain::order::OrderStatus;
use crate::domain::ports::{EscrowStore, WriteOp};
use crate::domain::user::{Actor, Role, User};
use crate::error::{MarketError, Result};
use crate::infrastructure::gateway::{HmacGateway, order_paid_payload, wallet_topup_payload};
use crate::interfaces::csv::op_reader::{OpRecord, OpType};
use chrono::Utc;

fn require<T>(value: Option<T>, column: &str) -> Result<T> {
    value.ok_or_else(|| MarketError::Validation(format!("{column} column is required")))
}

/// Maps operation records onto engine calls.
///
/// The replayer doubles as the identity layer: `user` and `gig` rows are
/// provisioning and write straight to the store, everything else resolves the
/// acting user's role and goes through the engine. Webhook rows are signed
/// with the gateway secret so they exercise the full verification path.
pub struct Replayer<'a> {
    engine: &'a EscrowEngine,
    store: &'a dyn EscrowStore,
    signer: &'a HmacGateway,
}

impl<'a> Replayer<'a> {
    pub fn new(
        engine: &'a EscrowEngine,
        store: &'a dyn EscrowStore,
        signer: &'a HmacGateway,
    ) -> Self {
        Self {
            engine,
            store,
            signer,
        }
    }

    async fn actor(&self, id: Option<u64>) -> Result<Actor> {
        let id = require(id, "user")?;
        let user = self
            .store
            .user(id)
            .await?
            .ok_or_else(|| MarketError::not_found("user", id))?;
        Ok(user.actor())
    }

    pub async fn apply(&self, record: OpRecord) -> Result<()> {
        match record.op {
            OpType::User => {
                let id = require(record.user, "user")?;
                let role: Role = require(record.arg, "arg")?.parse()?;
                let user = User::new(id, format!("user-{id}"), role, Utc::now());
                self.store.commit(WriteOp::PutUser(user).into()).await?;
            }
            OpType::Gig => {
                let seller_id = require(record.user, "user")?;
                let id = require(record.target, "target")?;
                let price_basic = Amount::new(require(record.amount, "amount")?)?;
                let gig = Gig {
                    id,
                    seller_id,
                    title: record.arg.unwrap_or_else(|| format!("gig-{id}")),
                    price_basic,
                    price_standard: None,
                    price_premium: None,
                    published: true,
                    created_at: Utc::now(),
                };
                self.store.commit(WriteOp::PutGig(gig).into()).await?;
            }
            OpType::Order => {
                let actor = self.actor(record.user).await?;
                let gig_id = require(record.target, "target")?;
                let tier = match record.arg.as_deref() {
                    Some(tier) => tier.parse::<PackageTier>()?,
                    None => PackageTier::Basic,
                };
                self.engine.create_order(&actor, gig_id, tier).await?;
            }
            OpType::Topup => {
                let user_id = require(record.user, "user")?;
                let amount = require(record.amount, "amount")?;
                let reference = require(record.arg, "arg")?;
                let body = wallet_topup_payload(&reference, user_id, amount);
                let signature = self.signer.sign(&body);
                self.engine.handle_webhook(&body, &signature).await?;
            }
            OpType::PayWallet => {
                let actor = self.actor(record.user).await?;
                let order_id = require(record.target, "target")?;
                self.engine.pay_with_wallet(&actor, order_id).await?;
            }
            OpType::PayCard => {
                let order_id = require(record.target, "target")?;
                let reference = require(record.arg, "arg")?;
                let body = order_paid_payload(&reference, order_id);
                let signature = self.signer.sign(&body);
                self.engine.handle_webhook(&body, &signature).await?;
            }
            OpType::Transition => {
                let actor = self.actor(record.user).await?;
                let order_id = require(record.target, "target")?;
                let status: OrderStatus = require(record.arg, "arg")?.parse()?;
                self.engine
                    .request_transition(&actor, order_id, status)
                    .await?;
            }
            OpType::Milestone => {
                let actor = self.actor(record.user).await?;
                let order_id = require(record.target, "target")?;
                let draft = MilestoneDraft {
                    title: record.arg.unwrap_or_else(|| "milestone".to_string()),
                    description: None,
                    amount: Amount::new(require(record.amount, "amount")?)?,
                    due_date: None,
                };
                self.engine.create_milestone(&actor, order_id, draft).await?;
            }
            OpType::MilestoneDone => {
                let actor = self.actor(record.user).await?;
                let order_id = require(record.target, "target")?;
                let milestone_id = require(record.arg, "arg")?
                    .parse::<u64>()
                    .map_err(|_| MarketError::Validation("invalid milestone id".to_string()))?;
                self.engine
                    .complete_milestone(&actor, order_id, milestone_id)
                    .await?;
            }
            OpType::Dispute => {
                let actor = self.actor(record.user).await?;
                let order_id = require(record.target, "target")?;
                let reason = record.arg.unwrap_or_else(|| "dispute raised".to_string());
                self.engine.raise_dispute(&actor, order_id, reason).await?;
            }
            OpType::Resolve => {
                let actor = self.actor(record.user).await?;
                let dispute_id = require(record.target, "target")?;
                let outcome: DisputeOutcome = require(record.arg, "arg")?.parse()?;
                self.engine
                    .resolve_dispute(&actor, dispute_id, outcome, "resolved by admin")
                    .await?;
            }
            OpType::Withdraw => {
                let actor = self.actor(record.user).await?;
                let amount = Amount::new(require(record.amount, "amount")?)?;
                self.engine.request_withdrawal(&actor, amount).await?;
            }
            OpType::WithdrawApprove => {
                let actor = self.actor(record.user).await?;
                let withdrawal_id = require(record.target, "target")?;
                self.engine
                    .approve_withdrawal(&actor, withdrawal_id)
                    .await?;
            }
            OpType::WithdrawReject => {
                let actor = self.actor(record.user).await?;
                let withdrawal_id = require(record.target, "target")?;
                self.engine.reject_withdrawal(&actor, withdrawal_id).await?;
            }
            OpType::Review => {
                let actor = self.actor(record.user).await?;
                let order_id = require(record.target, "target")?;
                let rating = require(record.arg, "arg")?
                    .parse::<u8>()
                    .map_err(|_| MarketError::Validation("invalid rating".to_string()))?;
                self.engine
                    .leave_review(&actor, order_id, rating, "")
                    .await?;
            }
        }
        Ok(())
    }
}
