use crate::{
    error::{Result, StoreError},
    repo::{PostRepo, UserRepo},
};
use stammtisch_common::model::{
    Id, ModelValidationError,
    post::{CreatePost, PartialPost, Post, PostContent, PostMarker},
    user::UserMarker,
};
use tracing::debug;

/// Owns posts. Each post belongs to exactly one user.
pub struct PostStore<R> {
    repo: R,
}

impl<R: UserRepo + PostRepo> PostStore<R> {
    #[must_use]
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn create_post(&self, author: Id<UserMarker>, content: String) -> Result<PartialPost> {
        let content = PostContent::new(content).map_err(ModelValidationError::from)?;
        if !self.repo.user_exists(author).await? {
            return Err(StoreError::UserNotFound(author));
        }

        let post = self.repo.insert_post(&CreatePost { author, content }).await?;

        debug!(id = %post.id, %author, "Post created");
        Ok(post)
    }

    pub async fn get_post(&self, id: Id<PostMarker>) -> Result<Post> {
        self.repo
            .fetch_post(id)
            .await?
            .ok_or(StoreError::PostNotFound(id))
    }

    /// Newest first.
    pub async fn list_posts_by_user(&self, user: Id<UserMarker>) -> Result<Vec<PartialPost>> {
        if !self.repo.user_exists(user).await? {
            return Err(StoreError::UserNotFound(user));
        }
        Ok(self.repo.list_posts_by_user(user).await?)
    }

    /// Only the owner may delete a post. Deletion cascades to the post's
    /// likes within a single transactional boundary.
    pub async fn delete_post(
        &self,
        post: Id<PostMarker>,
        requesting_user: Id<UserMarker>,
    ) -> Result<()> {
        let existing = self
            .repo
            .fetch_post(post)
            .await?
            .ok_or(StoreError::PostNotFound(post))?;

        if existing.author.id != requesting_user {
            return Err(StoreError::Forbidden {
                post,
                user: requesting_user,
            });
        }

        self.repo.delete_post_cascade(post).await?;

        debug!(%post, user = %requesting_user, "Post deleted");
        Ok(())
    }
}
