//! Read-only composite views over the three stores.

use crate::{
    error::{Result, StoreError},
    repo::{LikeRepo, PostRepo, UserRepo},
};
use base64::{DecodeError, Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{Error, Unexpected},
};
use stammtisch_common::model::{
    Id,
    post::{Post, PostMarker},
    user::{User, UserMarker},
};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

pub const TIMELINE_MAX_LIMIT: usize = 100;

/// Opaque pagination cursor. Keyed on the snowflake of the last post of the
/// previous page, so pages stay stable under concurrent inserts.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Cursor(Id<PostMarker>);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum InvalidCursorError {
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The decoded cursor has an invalid length")]
    InvalidLength,
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let encoded = BASE64_URL_SAFE_NO_PAD.encode(u64::from(self.0).to_be_bytes());
        f.write_str(&encoded)
    }
}

impl FromStr for Cursor {
    type Err = InvalidCursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 8] = BASE64_URL_SAFE_NO_PAD
            .decode(s)?
            .try_into()
            .map_err(|_| InvalidCursorError::InvalidLength)?;

        Ok(Self(u64::from_be_bytes(bytes).into()))
    }
}

impl Serialize for Cursor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        inner
            .parse()
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"Cursor"))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct TimelinePage {
    pub posts: Vec<Post>,
    /// `None` when this is the last page.
    pub next_cursor: Option<Cursor>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct UserProfile {
    pub user: User,
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct EnrichedPost {
    pub post: Post,
    pub like_count: u64,
    pub liked_by_viewer: bool,
}

/// Derives read-only views by composing the stores. Never mutates anything.
pub struct FeedAssembler<R> {
    repo: R,
}

impl<R: UserRepo + PostRepo + LikeRepo> FeedAssembler<R> {
    #[must_use]
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Posts authored by the user and everyone they follow, newest first.
    /// `limit` is clamped to `1..=TIMELINE_MAX_LIMIT`.
    pub async fn home_timeline(
        &self,
        user: Id<UserMarker>,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<TimelinePage> {
        if !self.repo.user_exists(user).await? {
            return Err(StoreError::UserNotFound(user));
        }

        let mut authors = self.repo.list_following(user).await?;
        authors.push(user);

        let limit = limit.clamp(1, TIMELINE_MAX_LIMIT);
        let before = cursor.map(|cursor| cursor.0);

        // One extra row decides whether another page exists.
        let mut posts = self
            .repo
            .fetch_timeline_page(&authors, limit + 1, before)
            .await?;

        let next_cursor = if posts.len() > limit {
            posts.truncate(limit);
            posts.last().map(|post| Cursor(post.id))
        } else {
            None
        };

        Ok(TimelinePage { posts, next_cursor })
    }

    pub async fn user_profile(&self, user: Id<UserMarker>) -> Result<UserProfile> {
        let user = self
            .repo
            .fetch_user(user)
            .await?
            .ok_or(StoreError::UserNotFound(user))?;

        let post_count = self.repo.count_posts_by_user(user.id).await?;
        let follower_count = self.repo.count_followers(user.id).await?;
        let following_count = self.repo.count_following(user.id).await?;

        Ok(UserProfile {
            user,
            post_count,
            follower_count,
            following_count,
        })
    }

    pub async fn enrich_post(&self, post: Post, viewer: Id<UserMarker>) -> Result<EnrichedPost> {
        let like_count = self.repo.count_likes(post.id).await?;
        let liked_by_viewer = self.repo.has_liked(viewer, post.id).await?;

        Ok(EnrichedPost {
            post,
            like_count,
            liked_by_viewer,
        })
    }
}
