use gigpay::application::engine::EscrowEngine;
use gigpay::domain::dispute::DisputeOutcome;
use gigpay::domain::gig::{Gig, PackageTier};
use gigpay::domain::money::Amount;
use gigpay::domain::order::OrderStatus;
use gigpay::domain::ports::{ChangeSet, EscrowStore, WriteOp};
use gigpay::domain::user::{Actor, Role, User};
use gigpay::domain::withdrawal::WithdrawalStatus;
use gigpay::infrastructure::gateway::{HmacGateway, order_paid_payload, wallet_topup_payload};
use gigpay::infrastructure::in_memory::InMemoryStore;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

const SECRET: &str = "whsec_test";

async fn seeded_market() -> (EscrowEngine, InMemoryStore, Vec<Actor>) {
    let store = InMemoryStore::new();
    let now = Utc::now();
    let mut seed = ChangeSet::new();
    let roles = [Role::Buyer, Role::Both, Role::Both, Role::Seller, Role::Admin];
    let mut actors = Vec::new();
    for (i, role) in roles.iter().enumerate() {
        let user = User::new(i as u64 + 1, format!("user-{i}"), *role, now);
        actors.push(user.actor());
        seed.push(WriteOp::PutUser(user));
    }
    seed.push(WriteOp::PutGig(Gig {
        id: 1,
        seller_id: 4,
        title: "backend work".to_string(),
        price_basic: Amount::new(dec!(40.00)).unwrap(),
        price_standard: Some(Amount::new(dec!(80.00)).unwrap()),
        price_premium: Some(Amount::new(dec!(120.00)).unwrap()),
        published: true,
        created_at: now,
    }));
    store.commit(seed).await.unwrap();

    let engine = EscrowEngine::new(
        Box::new(store.clone()),
        Box::new(HmacGateway::new(SECRET)),
    );
    (engine, store, actors)
}

/// Net wallet total must always equal the signed payment history minus
/// approved withdrawals, no matter what sequence of operations ran.
async fn assert_conservation(store: &InMemoryStore) {
    let users = store.users().await.unwrap();
    for user in &users {
        assert!(
            user.wallet_balance.value() >= Decimal::ZERO,
            "user {} went negative: {}",
            user.id,
            user.wallet_balance
        );
    }
    let total: Decimal = users.iter().map(|u| u.wallet_balance.value()).sum();
    let payment_flow: Decimal = store
        .payments()
        .await
        .unwrap()
        .iter()
        .map(|p| p.wallet_effect())
        .sum();
    let withdrawn: Decimal = store
        .withdrawals()
        .await
        .unwrap()
        .iter()
        .filter(|w| w.status == WithdrawalStatus::Approved)
        .map(|w| w.amount.value())
        .sum();
    assert_eq!(total, payment_flow - withdrawn);
}

#[tokio::test]
async fn test_conservation_under_random_operation_sequences() {
    let (engine, store, actors) = seeded_market().await;
    let signer = HmacGateway::new(SECRET);
    let mut rng = StdRng::seed_from_u64(42);
    let admin = actors[4];

    let mut orders: Vec<(u64, Actor)> = Vec::new();
    let mut disputes: Vec<u64> = Vec::new();
    let mut withdrawals: Vec<u64> = Vec::new();
    let mut event_seq = 0u64;

    for _ in 0..300 {
        let actor = actors[rng.gen_range(0..actors.len())];
        match rng.gen_range(0..9) {
            0 => {
                event_seq += 1;
                let amount = Decimal::new(rng.gen_range(500..50_000), 2);
                let body = wallet_topup_payload(&format!("evt_{event_seq}"), actor.id, amount);
                let sig = signer.sign(&body);
                engine.handle_webhook(&body, &sig).await.unwrap();
            }
            1 => {
                let tier = [PackageTier::Basic, PackageTier::Standard, PackageTier::Premium]
                    [rng.gen_range(0..3)];
                if let Ok(order) = engine.create_order(&actor, 1, tier).await {
                    orders.push((order.id, actor));
                }
            }
            2 => {
                if let Some(&(order_id, buyer)) = pick(&mut rng, &orders) {
                    let _ = engine.pay_with_wallet(&buyer, order_id).await;
                }
            }
            3 => {
                // External payment rail for a random order, retried at random.
                if let Some(&(order_id, _)) = pick(&mut rng, &orders) {
                    let body = order_paid_payload(&format!("card-order-{order_id}"), order_id);
                    let sig = signer.sign(&body);
                    engine.handle_webhook(&body, &sig).await.unwrap();
                }
            }
            4 => {
                if let Some(&(order_id, _)) = pick(&mut rng, &orders) {
                    let status = [
                        OrderStatus::Active,
                        OrderStatus::Delivered,
                        OrderStatus::Completed,
                        OrderStatus::Cancelled,
                    ][rng.gen_range(0..4)];
                    let _ = engine.request_transition(&actor, order_id, status).await;
                }
            }
            5 => {
                if let Some(&(order_id, buyer)) = pick(&mut rng, &orders) {
                    if let Ok(dispute) =
                        engine.raise_dispute(&buyer, order_id, "conservation test").await
                    {
                        disputes.push(dispute.id);
                    }
                }
            }
            6 => {
                if let Some(&dispute_id) = pick(&mut rng, &disputes) {
                    let outcome = if rng.gen_bool(0.5) {
                        DisputeOutcome::FavorBuyer
                    } else {
                        DisputeOutcome::FavorSeller
                    };
                    let _ = engine
                        .resolve_dispute(&admin, dispute_id, outcome, "ruled")
                        .await;
                }
            }
            7 => {
                let amount = Amount::new(Decimal::new(rng.gen_range(100..10_000), 2)).unwrap();
                if let Ok(withdrawal) = engine.request_withdrawal(&actor, amount).await {
                    withdrawals.push(withdrawal.id);
                }
            }
            _ => {
                if let Some(&withdrawal_id) = pick(&mut rng, &withdrawals) {
                    if rng.gen_bool(0.5) {
                        let _ = engine.approve_withdrawal(&admin, withdrawal_id).await;
                    } else {
                        let _ = engine.reject_withdrawal(&admin, withdrawal_id).await;
                    }
                }
            }
        }
    }

    assert_conservation(&store).await;
}

fn pick<'a, T, R: Rng>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.gen_range(0..items.len())])
    }
}

#[tokio::test]
async fn test_concurrent_duplicate_webhooks_apply_once() {
    let (engine, store, actors) = seeded_market().await;
    let signer = HmacGateway::new(SECRET);
    let buyer = actors[0];

    let order = engine
        .create_order(&buyer, 1, PackageTier::Basic)
        .await
        .unwrap();
    let body = order_paid_payload("evt_race", order.id);
    let sig = signer.sign(&body);

    let engine = Arc::new(engine);
    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = Arc::clone(&engine);
        let body = body.clone();
        let sig = sig.clone();
        handles.push(tokio::spawn(async move {
            engine.handle_webhook(&body, &sig).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.payments().await.unwrap().len(), 1);
    assert_eq!(
        store.order(order.id).await.unwrap().unwrap().status,
        OrderStatus::Active
    );
    assert_conservation(&store).await;
}

#[tokio::test]
async fn test_concurrent_transitions_settle_once() {
    let (engine, store, actors) = seeded_market().await;
    let signer = HmacGateway::new(SECRET);
    let buyer = actors[0];
    let seller = actors[3];

    let order = engine
        .create_order(&buyer, 1, PackageTier::Basic)
        .await
        .unwrap();
    let body = order_paid_payload("evt_pay", order.id);
    let sig = signer.sign(&body);
    engine.handle_webhook(&body, &sig).await.unwrap();
    engine
        .request_transition(&seller, order.id, OrderStatus::Delivered)
        .await
        .unwrap();

    // Buyer accepts from several handlers at once; the payout lands once.
    let engine = Arc::new(engine);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let order_id = order.id;
        handles.push(tokio::spawn(async move {
            engine
                .request_transition(&buyer, order_id, OrderStatus::Completed)
                .await
        }));
    }
    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    let seller_row = store.user(seller.id).await.unwrap().unwrap();
    assert_eq!(seller_row.wallet_balance.value(), dec!(38.00));
    assert_conservation(&store).await;
}
