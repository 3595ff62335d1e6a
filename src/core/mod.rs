pub mod config;
pub mod error;
pub mod types;

pub use config::{SpeedFactors, StationConfig};
pub use error::{Result, StationError};
pub use types::{BlockPos, EntityId, Facing, Tick};
