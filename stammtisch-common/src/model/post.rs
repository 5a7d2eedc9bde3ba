use crate::model::{
    Id,
    user::{User, UserMarker},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const POST_CONTENT_MAX_LEN: usize = 500;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub content: PostContent,
}

/// Listing form of a post, with the author left unresolved.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PartialPost {
    pub id: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub content: PostContent,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub content: PostContent,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostContent(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostContentError {
    #[error("The post content is empty")]
    Empty,
    #[error("The post content exceeds {POST_CONTENT_MAX_LEN} characters")]
    TooLong(String),
}

impl PostContent {
    pub fn new(content: String) -> Result<Self, InvalidPostContentError> {
        if content.is_empty() {
            Err(InvalidPostContentError::Empty)
        } else if content.chars().count() > POST_CONTENT_MAX_LEN {
            Err(InvalidPostContentError::TooLong(content))
        } else {
            Ok(PostContent(content))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for PostContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostContent::new(inner).map_err(|err| {
            Error::invalid_value(Unexpected::Other(&err.to_string()), &"PostContent")
        })
    }
}
