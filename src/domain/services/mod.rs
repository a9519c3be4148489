pub mod autobuy;
pub mod custody;
pub mod fee_collector;
pub mod ledger;
pub mod limits;
pub mod policy_store;
pub mod session;
pub mod swap_engine;
pub mod tracker;
