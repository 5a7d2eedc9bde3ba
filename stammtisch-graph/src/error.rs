use stammtisch_common::model::{
    Id, ModelValidationError,
    post::PostMarker,
    user::{UserHandle, UserMarker},
};
use thiserror::Error;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Failure of the persistence collaborator. The stores never retry these;
/// all mutations except `create_user`/`create_post` are idempotent by key,
/// so callers may retry them after a transient failure.
#[derive(Debug, Error)]
#[error("The persistence backend failed: {0}")]
pub struct StorageError(Box<dyn std::error::Error + Send + Sync>);

impl StorageError {
    #[must_use]
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User with id {0} was not found.")]
    UserNotFound(Id<UserMarker>),
    #[error("User with handle {} was not found.", .0.get())]
    UserByHandleNotFound(UserHandle),
    #[error("Post with id {0} was not found.")]
    PostNotFound(Id<PostMarker>),
    #[error("The handle {} is already taken.", .0.get())]
    DuplicateHandle(UserHandle),
    #[error("User {0} cannot follow themselves.")]
    SelfFollow(Id<UserMarker>),
    #[error("User {user} does not own post {post}.")]
    Forbidden {
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    },
    #[error("An object was invalid: {0}")]
    Validation(#[from] ModelValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
