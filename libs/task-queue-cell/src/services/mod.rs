pub mod memory;
pub mod queue;
pub mod worker;
