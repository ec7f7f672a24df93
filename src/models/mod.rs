//! Core data models for the ranking engine.

mod ids;
mod metric;
mod ranked;
mod snapshot;
mod trend;

pub use ids::*;
pub use metric::*;
pub use ranked::*;
pub use snapshot::*;
pub use trend::*;
