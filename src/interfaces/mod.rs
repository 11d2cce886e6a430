//! Inbound adapters: the CSV operation-log surface used by the replay CLI.

pub mod csv;
pub mod replay;
