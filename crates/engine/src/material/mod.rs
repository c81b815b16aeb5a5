pub mod manager;
pub mod scheduler;

pub use manager::MaterialManager;
pub use scheduler::{Scheduler, TimerFired, TokioScheduler};
