use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const USER_HANDLE_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub handle: UserHandle,
}

/// Registration input. The credential hash comes from the external auth
/// collaborator and is stored opaquely, never validated or returned here.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreateUser {
    pub handle: UserHandle,
    pub credential: CredentialHash,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserHandle(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidUserHandleError {
    #[error("The user handle is empty")]
    Empty,
    #[error("The user handle is too long: {0}")]
    TooLong(String),
}

impl UserHandle {
    pub fn new(handle: String) -> Result<Self, InvalidUserHandleError> {
        if handle.is_empty() {
            Err(InvalidUserHandleError::Empty)
        } else if handle.chars().count() > USER_HANDLE_MAX_LEN {
            Err(InvalidUserHandleError::TooLong(handle))
        } else {
            Ok(UserHandle(handle))
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

impl<'de> Deserialize<'de> for UserHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserHandle::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Other(&err.to_string()), &"UserHandle"))
    }
}

#[derive(Clone, Eq, PartialEq, Default, Hash)]
pub struct CredentialHash(Box<[u8]>);

impl CredentialHash {
    #[must_use]
    pub fn new(hash: Box<[u8]>) -> Self {
        Self(hash)
    }

    #[must_use]
    pub fn get(&self) -> &[u8] {
        &self.0
    }
}

impl From<Box<[u8]>> for CredentialHash {
    fn from(value: Box<[u8]>) -> Self {
        Self::new(value)
    }
}

impl Debug for CredentialHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CredentialHash").field(&"[redacted]").finish()
    }
}
