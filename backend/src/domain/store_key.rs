//! Keys addressing lists in the backing store.
//!
//! Every key belongs to exactly one [`Namespace`]. Per-subject lists are
//! written as `{namespace}_{subject}`; the global track log uses the bare
//! namespace.

use std::fmt;

/// Fixed prefixes partitioning the store into logical collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Per-subject profile: every event a subject produced.
    Users,
    /// Global log of every event.
    Tracks,
    /// Per-subject list of visited item ids.
    Visits,
}

impl Namespace {
    /// Prefix written into the store.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Tracks => "tracks",
            Self::Visits => "visits",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composed store key.
///
/// # Examples
/// ```
/// use tracker::domain::{Namespace, StoreKey};
///
/// assert_eq!(StoreKey::subject(Namespace::Visits, "12345").as_str(), "visits_12345");
/// assert_eq!(StoreKey::global(Namespace::Tracks).as_str(), "tracks");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    namespace: Namespace,
    value: String,
}

impl StoreKey {
    /// Key for the namespace-wide list.
    pub fn global(namespace: Namespace) -> Self {
        Self {
            namespace,
            value: namespace.as_str().to_owned(),
        }
    }

    /// Key for one subject's list inside `namespace`.
    pub fn subject(namespace: Namespace, subject_id: &str) -> Self {
        Self {
            namespace,
            value: format!("{}_{subject_id}", namespace.as_str()),
        }
    }

    /// Namespace this key lives in.
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Borrow the key as written to the store.
    pub fn as_str(&self) -> &str {
        self.value.as_str()
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for StoreKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Namespace::Users, "users_abcd")]
    #[case(Namespace::Tracks, "tracks_abcd")]
    #[case(Namespace::Visits, "visits_abcd")]
    fn subject_keys_join_with_underscore(#[case] namespace: Namespace, #[case] expected: &str) {
        let key = StoreKey::subject(namespace, "abcd");
        assert_eq!(key.as_str(), expected);
        assert_eq!(key.namespace(), namespace);
    }

    #[rstest]
    fn same_subject_never_collides_across_namespaces() {
        let users = StoreKey::subject(Namespace::Users, "abcd");
        let visits = StoreKey::subject(Namespace::Visits, "abcd");
        assert_ne!(users, visits);
    }
}
