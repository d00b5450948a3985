//! Newtype ids for Slack entities and intake requests.
//!
//! Use the `define_string_id!` macro to create type-safe string wrappers that
//! prevent accidentally mixing ids from different Slack entity types. Each id
//! carries a validator that runs on `parse` and on deserialization, so a value
//! of one of these types has already passed the grammar in
//! [`crate::validation`].

use chrono::{DateTime, TimeZone, Utc};

use crate::validation::{
    ValidationError, validate_channel_id, validate_message_ts, validate_request_id,
    validate_user_id,
};

/// Macro to define a validated string id wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string, `Deserialize` through the validator
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `Display`, `AsRef<str>`
/// - `parse()` running the given validator with the given field name
///
/// # Example
///
/// ```rust
/// # use sape_core::define_string_id;
/// # use sape_core::validation::ValidationError;
/// fn non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str, ValidationError> {
///     if value.is_empty() {
///         return Err(ValidationError::new(field, value, "must not be empty"));
///     }
///     Ok(value)
/// }
///
/// define_string_id!(BoardId, "boardId", non_empty);
///
/// assert!(BoardId::parse("b-1").is_ok());
/// assert!(BoardId::parse("").is_err());
/// ```
#[macro_export]
macro_rules! define_string_id {
    ($name:ident, $field:literal, $validator:path) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an id.
            ///
            /// # Errors
            ///
            /// Returns a validation error if the value does not match the id grammar.
            pub fn parse(
                value: impl Into<String>,
            ) -> ::core::result::Result<Self, $crate::validation::ValidationError> {
                let value = value.into();
                $validator(&value, $field)?;
                Ok(Self(value))
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the id and returns its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::convert::TryFrom<String> for $name {
            type Error = $crate::validation::ValidationError;

            fn try_from(value: String) -> ::core::result::Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::validation::ValidationError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Accept any non-empty opaque id (list, row and column ids have no fixed grammar).
fn validate_opaque<'a>(value: &'a str, field: &str) -> Result<&'a str, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, value, "must be a non-empty string"));
    }
    Ok(value)
}

define_string_id!(UserId, "userId", validate_user_id);
define_string_id!(ChannelId, "channelId", validate_channel_id);
define_string_id!(MessageTs, "messageTs", validate_message_ts);
define_string_id!(ListId, "listId", validate_opaque);
define_string_id!(RowId, "rowId", validate_opaque);
define_string_id!(ColumnId, "columnId", validate_opaque);

/// The two intake workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Penetration test request (`PT-…`).
    Pentest,
    /// Threat-modeling request (`TM-…`).
    ThreatModeling,
}

impl RequestKind {
    /// Id prefix for this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Pentest => "PT",
            Self::ThreatModeling => "TM",
        }
    }

    /// Event type used in message metadata for this kind.
    #[must_use]
    pub const fn event_type(self) -> &'static str {
        match self {
            Self::Pentest => "pentest_request",
            Self::ThreatModeling => "threatmodeling_request",
        }
    }

    /// Resolve a kind from a message metadata event type.
    #[must_use]
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "pentest_request" => Some(Self::Pentest),
            "threatmodeling_request" => Some(Self::ThreatModeling),
            _ => None,
        }
    }
}

/// Request id, `<PREFIX>-<unix millis>`.
///
/// Only the 3–50 character bound is enforced on parse; ids minted by
/// [`RequestId::generate`] additionally carry a kind prefix and a creation
/// timestamp, which [`RequestId::kind`] and [`RequestId::timestamp`] recover.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    /// Parse and validate a request id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the id is not 3–50 characters long.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_request_id(&value, "requestId")?;
        Ok(Self(value))
    }

    /// Mint a new id for the given kind at the given time.
    #[must_use]
    pub fn generate(kind: RequestKind, at: DateTime<Utc>) -> Self {
        Self(format!("{}-{}", kind.prefix(), at.timestamp_millis()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The request kind encoded in the prefix, if recognizable.
    #[must_use]
    pub fn kind(&self) -> Option<RequestKind> {
        match self.0.split_once('-')?.0 {
            "PT" => Some(RequestKind::Pentest),
            "TM" => Some(RequestKind::ThreatModeling),
            _ => None,
        }
    }

    /// The creation time encoded in the suffix, if it is a millisecond timestamp.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.0.split_once('-')?.1.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RequestId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl std::str::FromStr for RequestId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_parse_and_display() {
        let id = UserId::parse("U0000000001").expect("valid user id");
        assert_eq!(id.to_string(), "U0000000001");
        assert_eq!(id.as_str(), "U0000000001");
        assert!(UserId::parse("U1").is_err());
    }

    #[test]
    fn test_ids_deserialize_through_validator() {
        let ok: ChannelId = serde_json::from_str("\"C012345678\"").expect("valid channel");
        assert_eq!(ok.as_str(), "C012345678");

        let err = serde_json::from_str::<ChannelId>("\"not-a-channel\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let ts = MessageTs::parse("1712345678.000100").expect("valid ts");
        assert_eq!(
            serde_json::to_string(&ts).expect("serialize"),
            "\"1712345678.000100\""
        );
    }

    #[test]
    fn test_request_id_generate_roundtrips_kind_and_time() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).single().expect("valid time");
        let id = RequestId::generate(RequestKind::ThreatModeling, at);

        assert_eq!(id.as_str(), "TM-1700000000123");
        assert_eq!(id.kind(), Some(RequestKind::ThreatModeling));
        assert_eq!(id.timestamp(), Some(at));
    }

    #[test]
    fn test_request_id_without_timestamp() {
        let id = RequestId::parse("DEMO-000").expect("valid id");
        assert_eq!(id.kind(), None);
        assert_eq!(id.timestamp().map(|t| t.timestamp()), Some(0));

        let id = RequestId::parse("PT-abc").expect("valid id");
        assert_eq!(id.kind(), Some(RequestKind::Pentest));
        assert_eq!(id.timestamp(), None);
    }

    #[test]
    fn test_opaque_ids_reject_blank() {
        assert!(ListId::parse("F0123ABC").is_ok());
        assert!(RowId::parse("   ").is_err());
        assert!(ColumnId::parse("").is_err());
    }
}
