//! REST API endpoint modules.

pub mod audit;
pub mod merge;
pub mod status;
pub mod tenant;
pub mod versions;
