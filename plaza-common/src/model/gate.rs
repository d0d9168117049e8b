//! The ownership gate applied to every mutation of an owned resource.
//!
//! One decision procedure serves every resource kind: anything exposing an
//! owning identity through [`OwnedResource`] gets the same rules. Reads are
//! identity-agnostic once the caller is authenticated; edits and deletions
//! require the requester to be the owner.

use crate::model::{
    Id,
    post::{PartialPost, Post},
    user::{User, UserMarker},
};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ResourceOp {
    View,
    Edit,
    Delete,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
#[must_use]
pub enum Verdict {
    Allow,
    Deny,
}

impl Verdict {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// A resource with a single owning user identity.
pub trait OwnedResource {
    fn owner_id(&self) -> Id<UserMarker>;
}

impl OwnedResource for User {
    fn owner_id(&self) -> Id<UserMarker> {
        self.id
    }
}

impl OwnedResource for Post {
    fn owner_id(&self) -> Id<UserMarker> {
        self.user.id
    }
}

impl OwnedResource for PartialPost {
    fn owner_id(&self) -> Id<UserMarker> {
        self.user
    }
}

/// Pure verdict; never fails and has no side effects. Callers translate
/// [`Verdict::Deny`] into their forbidden signal, which must stay
/// distinguishable from not-found and unauthenticated.
pub fn authorize(
    requester: Id<UserMarker>,
    resource: &impl OwnedResource,
    op: ResourceOp,
) -> Verdict {
    match op {
        ResourceOp::View => Verdict::Allow,
        ResourceOp::Edit | ResourceOp::Delete => {
            if resource.owner_id() == requester {
                Verdict::Allow
            } else {
                Verdict::Deny
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OwnedResource, ResourceOp, Verdict, authorize};
    use crate::model::{Id, user::UserMarker};

    struct Owned(Id<UserMarker>);

    impl OwnedResource for Owned {
        fn owner_id(&self) -> Id<UserMarker> {
            self.0
        }
    }

    #[test]
    fn owner_may_do_anything() {
        let owner = Id::new(1);
        let resource = Owned(owner);

        for op in [ResourceOp::View, ResourceOp::Edit, ResourceOp::Delete] {
            assert_eq!(authorize(owner, &resource, op), Verdict::Allow);
        }
    }

    #[test]
    fn non_owner_may_only_view() {
        let resource = Owned(Id::new(1));
        let stranger = Id::new(2);

        assert_eq!(
            authorize(stranger, &resource, ResourceOp::View),
            Verdict::Allow
        );
        assert_eq!(
            authorize(stranger, &resource, ResourceOp::Edit),
            Verdict::Deny
        );
        assert_eq!(
            authorize(stranger, &resource, ResourceOp::Delete),
            Verdict::Deny
        );
    }
}
