//! CLI command implementations.

mod analyze;
mod config;
mod doctor;
mod levels;
mod serve;

pub use analyze::run_analyze;
pub use config::run_config;
pub use doctor::run_doctor;
pub use levels::run_levels;
pub use serve::run_serve;
