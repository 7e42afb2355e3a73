//! Space-delimited permission sets.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A set of permission strings, parsed from and rendered to the
/// space-delimited form used on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Scope(BTreeSet<String>);

impl Scope {
    /// Parses a space-delimited scope string. Repeated whitespace and
    /// duplicate entries are ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self(raw.split_whitespace().map(String::from).collect())
    }

    /// Returns true if the scope grants the given permission.
    #[must_use]
    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    /// Returns true if no permissions are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the permissions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns true if every permission of `other` is granted by `self`.
    #[must_use]
    pub fn is_superset(&self, other: &Self) -> bool {
        self.0.is_superset(&other.0)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for permission in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(permission)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Scope {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Scope {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl<S: Into<String>> FromIterator<S> for Scope {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignores_extra_whitespace_and_duplicates() {
        let scope = Scope::parse("  openid profile   openid email ");
        assert_eq!(scope.len(), 3);
        assert!(scope.contains("openid"));
        assert!(scope.contains("email"));
        assert!(!scope.contains("offline_access"));
    }

    #[test]
    fn test_display_is_sorted_and_space_delimited() {
        let scope = Scope::parse("openid profile email offline_access");
        assert_eq!(scope.to_string(), "email offline_access openid profile");
        assert_eq!(Scope::parse(&scope.to_string()), scope);
    }

    #[test]
    fn test_equality_ignores_order() {
        assert_eq!(Scope::parse("a b"), Scope::parse("b a"));
    }

    #[test]
    fn test_superset() {
        let granted = Scope::parse("openid profile email offline_access");
        assert!(granted.is_superset(&Scope::parse("openid email")));
        assert!(!granted.is_superset(&Scope::parse("openid read:current_user")));
    }

    #[test]
    fn test_empty() {
        assert!(Scope::parse("   ").is_empty());
        assert_eq!(Scope::default().to_string(), "");
    }
}
