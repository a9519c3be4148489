pub mod policy;
pub mod position;
pub mod subscription;
pub mod wallet;
