//! PostgreSQL persistence for the stammtisch social graph.
//!
//! [`client::DbClient`] implements the repository traits of
//! `stammtisch-graph`. The schema lives in `migrations/`; it carries the
//! uniqueness constraints the stores rely on but no `ON DELETE CASCADE`
//! rules, cascades are explicit transactions here.

pub mod client;
pub mod config;
mod record;
