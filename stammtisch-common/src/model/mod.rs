pub mod like;
pub mod post;
pub mod user;

use crate::{
    model::{post::InvalidPostContentError, user::InvalidUserHandleError},
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserHandle(#[from] InvalidUserHandleError),
    #[error(transparent)]
    PostContent(#[from] InvalidPostContentError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct StammtischEpoch;
impl Epoch for StammtischEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type StammtischSnowflake = Snowflake<StammtischEpoch>;
pub type StammtischSnowflakeGenerator = SnowflakeGenerator<StammtischEpoch>;

/// Entity ID. The marker type prevents mixing up IDs of different entities.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(StammtischSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: StammtischSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> StammtischSnowflake {
        self.0
    }

    /// The creation time encoded in the ID's snowflake.
    #[must_use]
    pub fn created_at(self) -> UtcDateTime {
        self.0.timestamp().into()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<StammtischSnowflake> for Id<Marker> {
    fn from(value: StammtischSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for StammtischSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(StammtischSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
