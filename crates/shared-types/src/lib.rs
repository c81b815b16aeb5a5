pub mod error;
pub mod feature_flags;

// Intake domain modules
pub mod case;
pub mod config;
pub mod cps;
pub mod event;
pub mod material;
pub mod problem;
pub mod prosecution;

pub use error::*;
pub use feature_flags::*;

pub use case::*;
pub use config::*;
pub use cps::*;
pub use event::*;
pub use material::*;
pub use problem::*;
pub use prosecution::*;
