//! Core of the stammtisch social graph service.
//!
//! Four components operate over a shared persisted data model: the
//! [`identity::IdentityStore`] owns users and follow edges, the
//! [`posts::PostStore`] owns posts, the [`engagement::EngagementStore`] owns
//! likes, and the [`feed::FeedAssembler`] derives read-only composite views
//! from the other three. Persistence is injected through the repository
//! traits in [`repo`]; this crate never talks to a storage backend directly.

pub mod engagement;
pub mod error;
pub mod feed;
pub mod identity;
pub mod posts;
pub mod repo;
