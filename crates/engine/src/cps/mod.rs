pub mod matcher;
pub mod service;

pub use matcher::match_defendants;
pub use service::CpsService;
