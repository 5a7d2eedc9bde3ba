//! The contract the stores require of the persistence collaborator.
//!
//! Implementations mint entity IDs themselves, own the transactional
//! boundaries of the cascade procedures, and back `insert_follow` /
//! `insert_like` with a composite uniqueness constraint so that concurrent
//! duplicate writes resolve to a single row.

use crate::error::StorageError;
use async_trait::async_trait;
use stammtisch_common::model::{
    Id,
    like::Like,
    post::{CreatePost, PartialPost, Post, PostMarker},
    user::{CreateUser, User, UserHandle, UserMarker},
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Unique-key insert. Returns `None` when the handle is already taken.
    async fn insert_user(&self, user: &CreateUser) -> Result<Option<Id<UserMarker>>, StorageError>;

    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>, StorageError>;

    async fn fetch_user_by_handle(&self, handle: &UserHandle)
    -> Result<Option<User>, StorageError>;

    async fn user_exists(&self, id: Id<UserMarker>) -> Result<bool, StorageError>;

    /// Idempotent edge insert. Returns whether a new edge was stored.
    async fn insert_follow(
        &self,
        follower: Id<UserMarker>,
        followee: Id<UserMarker>,
    ) -> Result<bool, StorageError>;

    /// Idempotent edge delete. Returns whether an edge was removed.
    async fn delete_follow(
        &self,
        follower: Id<UserMarker>,
        followee: Id<UserMarker>,
    ) -> Result<bool, StorageError>;

    async fn list_following(&self, user: Id<UserMarker>)
    -> Result<Vec<Id<UserMarker>>, StorageError>;

    /// Inverse of the stored edge set; followers are never materialized.
    async fn list_followers(&self, user: Id<UserMarker>)
    -> Result<Vec<Id<UserMarker>>, StorageError>;

    async fn count_following(&self, user: Id<UserMarker>) -> Result<u64, StorageError>;

    async fn count_followers(&self, user: Id<UserMarker>) -> Result<u64, StorageError>;

    /// Removes the user, their posts, all likes by them or on their posts,
    /// and all follow edges in either direction, atomically. Returns whether
    /// the user existed.
    async fn delete_user_cascade(&self, id: Id<UserMarker>) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn insert_post(&self, post: &CreatePost) -> Result<PartialPost, StorageError>;

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>, StorageError>;

    async fn post_exists(&self, id: Id<PostMarker>) -> Result<bool, StorageError>;

    /// Newest first.
    async fn list_posts_by_user(
        &self,
        user: Id<UserMarker>,
    ) -> Result<Vec<PartialPost>, StorageError>;

    async fn count_posts_by_user(&self, user: Id<UserMarker>) -> Result<u64, StorageError>;

    /// Removes the post and its likes atomically. Returns whether the post
    /// existed.
    async fn delete_post_cascade(&self, id: Id<PostMarker>) -> Result<bool, StorageError>;

    /// Posts by any of `authors`, strictly older than `before` when given,
    /// newest first, at most `limit`. Must not return posts whose author no
    /// longer exists.
    async fn fetch_timeline_page(
        &self,
        authors: &[Id<UserMarker>],
        limit: usize,
        before: Option<Id<PostMarker>>,
    ) -> Result<Vec<Post>, StorageError>;
}

#[async_trait]
pub trait LikeRepo: Send + Sync {
    /// Unique-index-backed upsert. Returns the stored like, whether it was
    /// just created or already present.
    async fn insert_like(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<Like, StorageError>;

    /// Idempotent delete. Returns whether a like was removed.
    async fn delete_like(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<bool, StorageError>;

    async fn has_liked(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<bool, StorageError>;

    async fn count_likes(&self, post: Id<PostMarker>) -> Result<u64, StorageError>;
}
