use crate::model::{Id, post::PostMarker, user::UserMarker};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct LikeMarker;

/// A user liking a post. At most one per (user, post) pair.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Like {
    pub id: Id<LikeMarker>,
    pub user: Id<UserMarker>,
    pub post: Id<PostMarker>,
}
