#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("market_db");

    // 1. First run: provision the market and fund the buyer.
    let csv1 = tempfile::NamedTempFile::new().unwrap();
    common::write_ops(csv1.path(), true, &["topup, 1, , 150.00, evt_1"]).unwrap();

    let mut cmd1 = Command::new(cargo_bin!("gigpay"));
    cmd1.arg(csv1.path()).arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,buyer,150.00"));

    // 2. Second run: users, gig and funds recovered; run the order through.
    let csv2 = tempfile::NamedTempFile::new().unwrap();
    common::write_ops(
        csv2.path(),
        false,
        &[
            "order, 1, 1, ,",
            "pay_wallet, 1, 1, ,",
            "transition, 2, 1, , delivered",
            "transition, 1, 1, , completed",
        ],
    )
    .unwrap();

    let mut cmd2 = Command::new(cargo_bin!("gigpay"));
    cmd2.arg(csv2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("1,buyer,50.00"));
    assert!(stdout2.contains("2,seller,95.00"));
}

#[test]
fn test_duplicate_event_across_restarts() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("market_db");

    let csv1 = tempfile::NamedTempFile::new().unwrap();
    common::write_ops(csv1.path(), true, &["topup, 1, , 25.00, evt_1"]).unwrap();
    let mut cmd1 = Command::new(cargo_bin!("gigpay"));
    cmd1.arg(csv1.path()).arg("--db-path").arg(&db_path);
    assert!(cmd1.output().unwrap().status.success());

    // The provider redelivers evt_1 after a restart; it must not apply again.
    let csv2 = tempfile::NamedTempFile::new().unwrap();
    common::write_ops(csv2.path(), false, &["topup, 1, , 25.00, evt_1"]).unwrap();
    let mut cmd2 = Command::new(cargo_bin!("gigpay"));
    cmd2.arg(csv2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().unwrap();
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("1,buyer,25.00"));
}
