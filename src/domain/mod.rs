//! Core domain types and logic: operation kinds, the ledger, fee schedules,
//! portfolio aggregation, and the portfolio registry.

pub mod kind;
pub mod operation;
pub mod ledger;
pub mod fees;
pub mod portfolio;
pub mod registry;
pub mod error;
