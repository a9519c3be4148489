pub mod jupiter;
pub mod keystore;
pub mod market_data;
pub mod notifier;
pub mod retry;
pub mod solana_rpc;
