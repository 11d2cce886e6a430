use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::NamedTempFile;

mod common;

#[test]
fn test_dispute_resolved_for_buyer_refunds_escrow() {
    let file = NamedTempFile::new().unwrap();
    common::write_ops(
        file.path(),
        true,
        &[
            "topup, 1, , 150.00, evt_1",
            "order, 1, 1, ,",
            "pay_wallet, 1, 1, ,",
            "transition, 2, 1, , delivered",
            "dispute, 1, 1, , not as described",
            "resolve, 9, 1, , favor_buyer",
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("gigpay"));
    cmd.arg(file.path());

    // Full escrowed amount back to the buyer, nothing to the seller.
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1,buyer,150.00"))
        .stdout(predicate::str::contains("2,seller,0"));
}

#[test]
fn test_dispute_resolved_for_seller_releases_payout() {
    let file = NamedTempFile::new().unwrap();
    common::write_ops(
        file.path(),
        true,
        &[
            "topup, 1, , 150.00, evt_1",
            "order, 1, 1, ,",
            "pay_wallet, 1, 1, ,",
            "dispute, 1, 1, , too slow",
            "resolve, 9, 1, , favor_seller",
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("gigpay"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1,buyer,50.00"))
        .stdout(predicate::str::contains("2,seller,95.00"));
}

#[test]
fn test_second_resolution_is_rejected() {
    let file = NamedTempFile::new().unwrap();
    common::write_ops(
        file.path(),
        true,
        &[
            "topup, 1, , 100.00, evt_1",
            "order, 1, 1, ,",
            "pay_wallet, 1, 1, ,",
            "dispute, 1, 1, ,",
            "resolve, 9, 1, , favor_buyer",
            "resolve, 9, 1, , favor_seller",
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("gigpay"));
    cmd.arg(file.path());

    // The second ruling fails and moves no funds.
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("dispute already resolved"))
        .stdout(predicate::str::contains("1,buyer,100.00"))
        .stdout(predicate::str::contains("2,seller,0"));
}

#[test]
fn test_only_buyer_may_raise_dispute() {
    let file = NamedTempFile::new().unwrap();
    common::write_ops(
        file.path(),
        true,
        &[
            "topup, 1, , 100.00, evt_1",
            "order, 1, 1, ,",
            "pay_wallet, 1, 1, ,",
            "dispute, 2, 1, , seller complaint",
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("gigpay"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("only the buyer may raise a dispute"));
}

#[test]
fn test_milestones_frozen_while_disputed() {
    let file = NamedTempFile::new().unwrap();
    common::write_ops(
        file.path(),
        true,
        &[
            "topup, 1, , 100.00, evt_1",
            "order, 1, 1, ,",
            "pay_wallet, 1, 1, ,",
            "milestone, 2, 1, 40.00, wireframes",
            "dispute, 1, 1, , scope dispute",
            "milestone, 2, 1, 10.00, extras",
            "milestone_done, 2, 1, 1",
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("gigpay"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "milestones cannot be added to a disputed order",
        ))
        .stderr(predicate::str::contains(
            "milestones are frozen while the order is disputed",
        ));
}
