//! Shared model types for the stammtisch social graph.

pub mod model;
pub mod snowflake;
