use crate::{
    error::{Result, StoreError},
    repo::{LikeRepo, PostRepo, UserRepo},
};
use stammtisch_common::model::{Id, like::Like, post::PostMarker, user::UserMarker};
use tracing::debug;

/// Owns likes, one at most per (user, post) pair.
pub struct EngagementStore<R> {
    repo: R,
}

impl<R: UserRepo + PostRepo + LikeRepo> EngagementStore<R> {
    #[must_use]
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Likes a post. If the pair is already liked this returns the existing
    /// record instead of failing; the uniqueness constraint underneath is a
    /// safety net, not the UX contract.
    pub async fn like(&self, user: Id<UserMarker>, post: Id<PostMarker>) -> Result<Like> {
        if !self.repo.user_exists(user).await? {
            return Err(StoreError::UserNotFound(user));
        }
        if !self.repo.post_exists(post).await? {
            return Err(StoreError::PostNotFound(post));
        }

        let like = self.repo.insert_like(user, post).await?;

        debug!(%user, %post, "Post liked");
        Ok(like)
    }

    /// A no-op if no such like exists.
    pub async fn unlike(&self, user: Id<UserMarker>, post: Id<PostMarker>) -> Result<()> {
        if self.repo.delete_like(user, post).await? {
            debug!(%user, %post, "Post unliked");
        }
        Ok(())
    }

    pub async fn count_likes(&self, post: Id<PostMarker>) -> Result<u64> {
        Ok(self.repo.count_likes(post).await?)
    }

    pub async fn has_liked(&self, user: Id<UserMarker>, post: Id<PostMarker>) -> Result<bool> {
        Ok(self.repo.has_liked(user, post).await?)
    }
}
