pub mod owner_worker;
pub mod pipeline;
