use crate::model::{Id, user::UserMarker};
use serde::Serialize;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct FollowMarker;

/// A directed follow edge. The pair is unique and self-edges are rejected
/// before insertion; removal is a hard delete.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Follow {
    pub id: Id<FollowMarker>,
    pub follower: Id<UserMarker>,
    pub following: Id<UserMarker>,
    pub created_at: UtcDateTime,
}
