//! Opaque document identifiers.
//!
//! Users, zines and flowers are keyed by store-assigned or client-generated
//! strings. The identity provider's principal id doubles as the user
//! profile's document id, so none of these are assumed to be UUIDs.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors raised when parsing a document identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdValidationError {
    /// The identifier was empty.
    Empty,
    /// The identifier carried leading or trailing whitespace.
    SurroundingWhitespace,
    /// The identifier contained a path separator.
    ContainsSlash,
}

impl fmt::Display for IdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "identifier must not be empty"),
            Self::SurroundingWhitespace => {
                write!(f, "identifier must not have surrounding whitespace")
            }
            Self::ContainsSlash => write!(f, "identifier must not contain '/'"),
        }
    }
}

impl std::error::Error for IdValidationError {}

fn validate(raw: &str) -> Result<(), IdValidationError> {
    if raw.is_empty() {
        return Err(IdValidationError::Empty);
    }
    if raw.trim() != raw {
        return Err(IdValidationError::SurroundingWhitespace);
    }
    if raw.contains('/') {
        return Err(IdValidationError::ContainsSlash);
    }
    Ok(())
}

macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and construct the identifier from borrowed input.
            pub fn new(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
                Self::from_owned(id.as_ref().to_owned())
            }

            /// Generate a fresh opaque identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            fn from_owned(id: String) -> Result<Self, IdValidationError> {
                validate(&id)?;
                Ok(Self(id))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::from_owned(value)
            }
        }
    };
}

document_id! {
    /// Identifier of a user, equal to the identity provider's principal id.
    UserId
}

document_id! {
    /// Identifier of a zine document.
    ZineId
}

document_id! {
    /// Identifier of a flower document.
    FlowerId
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", IdValidationError::Empty)]
    #[case(" u1", IdValidationError::SurroundingWhitespace)]
    #[case("u1\n", IdValidationError::SurroundingWhitespace)]
    #[case("users/u1", IdValidationError::ContainsSlash)]
    fn rejects_invalid_identifiers(#[case] raw: &str, #[case] expected: IdValidationError) {
        assert_eq!(UserId::new(raw), Err(expected));
    }

    #[rstest]
    fn accepts_provider_style_identifiers() {
        let id = UserId::new("Xk2p9QfZr8TqLmN0").expect("valid id");
        assert_eq!(id.as_str(), "Xk2p9QfZr8TqLmN0");
    }

    #[rstest]
    fn random_identifiers_are_distinct_and_valid() {
        let first = ZineId::random();
        let second = ZineId::random();
        assert_ne!(first, second);
        assert!(ZineId::new(first.as_str()).is_ok());
    }

    #[rstest]
    fn deserialising_validates_content() {
        let ok: Result<FlowerId, _> = serde_json::from_str("\"f1\"");
        assert!(ok.is_ok());
        let bad: Result<FlowerId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }
}
