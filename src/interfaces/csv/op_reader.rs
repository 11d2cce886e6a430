use crate::error::{MarketError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One marketplace operation, as replayed from a CSV log.
///
/// Column meaning depends on `op`; unused columns stay empty. Ids created by
/// `order`, `milestone`, `dispute` and `withdraw` rows are allocated
/// sequentially from 1 per entity, so later rows can reference them.
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    /// `user, <id>, , , <role>` — provision a user.
    User,
    /// `gig, <seller>, <gig id>, <basic price>, [title]` — publish a gig.
    Gig,
    /// `order, <buyer>, <gig id>, , [tier]` — create an order.
    Order,
    /// `topup, <user>, , <amount>, <event id>` — simulate a top-up webhook.
    Topup,
    /// `pay_wallet, <buyer>, <order>, ,` — pay an order from the wallet.
    PayWallet,
    /// `pay_card, , <order>, , <event id>` — simulate a card-payment webhook.
    PayCard,
    /// `transition, <actor>, <order>, , <status>` — request a status change.
    Transition,
    /// `milestone, <seller>, <order>, <amount>, [title]` — add a milestone.
    Milestone,
    /// `milestone_done, <seller>, <order>, , <milestone id>` — complete one.
    MilestoneDone,
    /// `dispute, <buyer>, <order>, , [reason]` — raise a dispute.
    Dispute,
    /// `resolve, <admin>, <dispute id>, , <favor_buyer|favor_seller>`.
    Resolve,
    /// `withdraw, <user>, , <amount>,` — request a withdrawal.
    Withdraw,
    /// `withdraw_approve, <admin>, <withdrawal id>, ,`.
    WithdrawApprove,
    /// `withdraw_reject, <admin>, <withdrawal id>, ,`.
    WithdrawReject,
    /// `review, <reviewer>, <order>, , <rating>` — review a completed order.
    Review,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OpRecord {
    pub op: OpType,
    pub user: Option<u64>,
    pub target: Option<u64>,
    pub amount: Option<Decimal>,
    pub arg: Option<String>,
}

/// Streams operation records from any `Read` source, trimming whitespace and
/// tolerating short rows.
pub struct OpReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OpReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn records(self) -> impl Iterator<Item = Result<OpRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(MarketError::from))
    }
}
