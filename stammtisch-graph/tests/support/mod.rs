//! In-memory repository implementation backing the store test suites.

use async_trait::async_trait;
use stammtisch_common::model::{
    Id, StammtischSnowflakeGenerator,
    like::Like,
    post::{CreatePost, PartialPost, Post, PostMarker},
    user::{CreateUser, CredentialHash, User, UserHandle, UserMarker},
};
use stammtisch_graph::{
    error::StorageError,
    repo::{LikeRepo, PostRepo, UserRepo},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
};

#[derive(Default)]
struct State {
    users: BTreeMap<Id<UserMarker>, User>,
    follows: BTreeSet<(Id<UserMarker>, Id<UserMarker>)>,
    posts: BTreeMap<Id<PostMarker>, PartialPost>,
    likes: BTreeMap<(Id<UserMarker>, Id<PostMarker>), Like>,
    snowflake_generator: StammtischSnowflakeGenerator,
}

/// Every operation holds the single state lock for its whole duration, which
/// makes the cascade procedures trivially atomic.
#[derive(Clone, Default)]
pub struct MemoryRepo {
    state: Arc<Mutex<State>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn handle(handle: &str) -> UserHandle {
    UserHandle::new(handle.to_owned()).unwrap()
}

pub fn new_user(user_handle: &str) -> CreateUser {
    CreateUser {
        handle: handle(user_handle),
        // Credentials are opaque to the graph; the auth collaborator owns them.
        credential: CredentialHash::default(),
    }
}

#[async_trait]
impl UserRepo for MemoryRepo {
    async fn insert_user(&self, user: &CreateUser) -> Result<Option<Id<UserMarker>>, StorageError> {
        let mut state = self.state.lock().unwrap();

        if state.users.values().any(|other| other.handle == user.handle) {
            return Ok(None);
        }

        let id = Id::new(state.snowflake_generator.generate());
        state.users.insert(
            id,
            User {
                id,
                handle: user.handle.clone(),
            },
        );
        Ok(Some(id))
    }

    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>, StorageError> {
        Ok(self.state.lock().unwrap().users.get(&id).cloned())
    }

    async fn fetch_user_by_handle(
        &self,
        user_handle: &UserHandle,
    ) -> Result<Option<User>, StorageError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .values()
            .find(|user| &user.handle == user_handle)
            .cloned())
    }

    async fn user_exists(&self, id: Id<UserMarker>) -> Result<bool, StorageError> {
        Ok(self.state.lock().unwrap().users.contains_key(&id))
    }

    async fn insert_follow(
        &self,
        follower: Id<UserMarker>,
        followee: Id<UserMarker>,
    ) -> Result<bool, StorageError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .follows
            .insert((follower, followee)))
    }

    async fn delete_follow(
        &self,
        follower: Id<UserMarker>,
        followee: Id<UserMarker>,
    ) -> Result<bool, StorageError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .follows
            .remove(&(follower, followee)))
    }

    async fn list_following(
        &self,
        user: Id<UserMarker>,
    ) -> Result<Vec<Id<UserMarker>>, StorageError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user)
            .map(|(_, followee)| *followee)
            .collect())
    }

    async fn list_followers(
        &self,
        user: Id<UserMarker>,
    ) -> Result<Vec<Id<UserMarker>>, StorageError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .follows
            .iter()
            .filter(|(_, followee)| *followee == user)
            .map(|(follower, _)| *follower)
            .collect())
    }

    async fn count_following(&self, user: Id<UserMarker>) -> Result<u64, StorageError> {
        Ok(self.list_following(user).await?.len() as u64)
    }

    async fn count_followers(&self, user: Id<UserMarker>) -> Result<u64, StorageError> {
        Ok(self.list_followers(user).await?.len() as u64)
    }

    async fn delete_user_cascade(&self, id: Id<UserMarker>) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();

        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        let owned_posts: BTreeSet<Id<PostMarker>> = state
            .posts
            .values()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();

        state.posts.retain(|post_id, _| !owned_posts.contains(post_id));
        state
            .likes
            .retain(|(user, post), _| *user != id && !owned_posts.contains(post));
        state
            .follows
            .retain(|(follower, followee)| *follower != id && *followee != id);

        Ok(true)
    }
}

#[async_trait]
impl PostRepo for MemoryRepo {
    async fn insert_post(&self, post: &CreatePost) -> Result<PartialPost, StorageError> {
        let mut state = self.state.lock().unwrap();

        let id = Id::new(state.snowflake_generator.generate());
        let stored = PartialPost {
            id,
            author_id: post.author,
            content: post.content.clone(),
        };
        state.posts.insert(id, stored.clone());
        Ok(stored)
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>, StorageError> {
        let state = self.state.lock().unwrap();

        let Some(partial) = state.posts.get(&id) else {
            return Ok(None);
        };
        let Some(author) = state.users.get(&partial.author_id) else {
            return Ok(None);
        };

        Ok(Some(Post {
            id: partial.id,
            author: author.clone(),
            content: partial.content.clone(),
        }))
    }

    async fn post_exists(&self, id: Id<PostMarker>) -> Result<bool, StorageError> {
        Ok(self.state.lock().unwrap().posts.contains_key(&id))
    }

    async fn list_posts_by_user(
        &self,
        user: Id<UserMarker>,
    ) -> Result<Vec<PartialPost>, StorageError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .posts
            .values()
            .rev()
            .filter(|post| post.author_id == user)
            .cloned()
            .collect())
    }

    async fn count_posts_by_user(&self, user: Id<UserMarker>) -> Result<u64, StorageError> {
        Ok(self.list_posts_by_user(user).await?.len() as u64)
    }

    async fn delete_post_cascade(&self, id: Id<PostMarker>) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();

        if state.posts.remove(&id).is_none() {
            return Ok(false);
        }
        state.likes.retain(|(_, post), _| *post != id);
        Ok(true)
    }

    async fn fetch_timeline_page(
        &self,
        authors: &[Id<UserMarker>],
        limit: usize,
        before: Option<Id<PostMarker>>,
    ) -> Result<Vec<Post>, StorageError> {
        let state = self.state.lock().unwrap();

        Ok(state
            .posts
            .values()
            .rev()
            .filter(|post| authors.contains(&post.author_id))
            .filter(|post| before.is_none_or(|before| post.id < before))
            .filter_map(|post| {
                let author = state.users.get(&post.author_id)?;
                Some(Post {
                    id: post.id,
                    author: author.clone(),
                    content: post.content.clone(),
                })
            })
            .take(limit)
            .collect())
    }
}

#[async_trait]
impl LikeRepo for MemoryRepo {
    async fn insert_like(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<Like, StorageError> {
        let mut state = self.state.lock().unwrap();

        if let Some(existing) = state.likes.get(&(user, post)) {
            return Ok(*existing);
        }

        let like = Like {
            id: Id::new(state.snowflake_generator.generate()),
            user,
            post,
        };
        state.likes.insert((user, post), like);
        Ok(like)
    }

    async fn delete_like(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<bool, StorageError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .likes
            .remove(&(user, post))
            .is_some())
    }

    async fn has_liked(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<bool, StorageError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .likes
            .contains_key(&(user, post)))
    }

    async fn count_likes(&self, post: Id<PostMarker>) -> Result<u64, StorageError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .likes
            .keys()
            .filter(|(_, liked_post)| *liked_post == post)
            .count() as u64)
    }
}
