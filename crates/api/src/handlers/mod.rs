pub mod generations;
pub mod queues;
pub mod usage;
