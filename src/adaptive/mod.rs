pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod mdp;
pub mod store;
pub mod types;

pub use config::AdaptiveConfig;
pub use engine::AdaptiveEngine;
pub use error::AdaptiveError;
pub use types::*;
