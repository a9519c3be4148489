//! Whole-document JSON persistence.
//!
//! Four independent documents (subscriptions, wallets, autobuy policies,
//! positions + fee ledger), each rewritten wholesale on mutation. Writes go
//! to a temp file first and are renamed into place so a crash mid-write
//! cannot corrupt a document.

pub mod models;
pub mod store;

pub use store::JsonStore;
