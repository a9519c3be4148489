//! mintwatch: contract-address tracking and autonomous Solana autobuys.
//!
//! Chat messages from tracked traders are scanned for contract addresses,
//! classified by chain, enriched with market data, delivered to subscribers,
//! and (for Solana mints) fed through each subscriber's autobuy policy. All
//! custodial secrets are sealed at rest; all per-owner trade mutations are
//! serialized through a worker task per owner.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
pub mod secrets;
