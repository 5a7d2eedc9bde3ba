use crate::{
    error::{Result, StoreError},
    repo::UserRepo,
};
use stammtisch_common::model::{
    Id,
    user::{CreateUser, User, UserHandle, UserMarker},
};
use tracing::debug;

/// Owns users and the follow edge set.
pub struct IdentityStore<R> {
    repo: R,
}

impl<R: UserRepo> IdentityStore<R> {
    #[must_use]
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn create_user(&self, create: CreateUser) -> Result<Id<UserMarker>> {
        let id = self
            .repo
            .insert_user(&create)
            .await?
            .ok_or_else(|| StoreError::DuplicateHandle(create.handle.clone()))?;

        debug!(%id, handle = create.handle.get(), "User created");
        Ok(id)
    }

    pub async fn get_user(&self, id: Id<UserMarker>) -> Result<User> {
        self.repo
            .fetch_user(id)
            .await?
            .ok_or(StoreError::UserNotFound(id))
    }

    pub async fn get_user_by_handle(&self, handle: &UserHandle) -> Result<User> {
        self.repo
            .fetch_user_by_handle(handle)
            .await?
            .ok_or_else(|| StoreError::UserByHandleNotFound(handle.clone()))
    }

    /// Creates the directed edge follower -> followee. A no-op if the edge
    /// already exists; reciprocity is never implied.
    pub async fn follow(&self, follower: Id<UserMarker>, followee: Id<UserMarker>) -> Result<()> {
        if follower == followee {
            return Err(StoreError::SelfFollow(follower));
        }
        self.ensure_user_exists(follower).await?;
        self.ensure_user_exists(followee).await?;

        if self.repo.insert_follow(follower, followee).await? {
            debug!(%follower, %followee, "Follow edge created");
        }
        Ok(())
    }

    /// A no-op if the edge does not exist.
    pub async fn unfollow(&self, follower: Id<UserMarker>, followee: Id<UserMarker>) -> Result<()> {
        if self.repo.delete_follow(follower, followee).await? {
            debug!(%follower, %followee, "Follow edge removed");
        }
        Ok(())
    }

    pub async fn list_following(&self, user: Id<UserMarker>) -> Result<Vec<Id<UserMarker>>> {
        self.ensure_user_exists(user).await?;
        Ok(self.repo.list_following(user).await?)
    }

    pub async fn list_followers(&self, user: Id<UserMarker>) -> Result<Vec<Id<UserMarker>>> {
        self.ensure_user_exists(user).await?;
        Ok(self.repo.list_followers(user).await?)
    }

    /// Removes the user together with their posts, all likes by them or on
    /// their posts, and every follow edge involving them. Either the whole
    /// cascade applies or none of it does.
    pub async fn delete_user(&self, id: Id<UserMarker>) -> Result<()> {
        if !self.repo.delete_user_cascade(id).await? {
            return Err(StoreError::UserNotFound(id));
        }

        debug!(%id, "User deleted");
        Ok(())
    }

    async fn ensure_user_exists(&self, id: Id<UserMarker>) -> Result<()> {
        if self.repo.user_exists(id).await? {
            Ok(())
        } else {
            Err(StoreError::UserNotFound(id))
        }
    }
}
