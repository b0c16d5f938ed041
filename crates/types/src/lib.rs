//! Validated text primitives shared by every physio crate.
//!
//! The bundle engine joins patient and exercise documents on a user id and looks patients up by
//! email. Both values travel through several layers (REST, core, storage), so they are wrapped
//! once at the boundary and never re-validated afterwards.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input does not look like `local@domain`
    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// The join key linking a patient bundle to its exercise bundle.
///
/// Both bundle families embed this value in a `User Id` marker. It is compared byte for byte,
/// so the only normalisation applied is the whitespace trim inherited from [`NonEmptyText`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct UserId(NonEmptyText);

impl UserId {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        NonEmptyText::new(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// An email address with a minimal shape check.
///
/// Casing is preserved exactly as supplied. Whether lookups treat `A@x.org` and `a@x.org` as the
/// same subject is a matching policy decision made by the core, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses an email address.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] for blank input and [`TextError::InvalidEmail`] when the
    /// trimmed input is not `local@domain` with both sides non-empty and no whitespace.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }

        let valid = match trimmed.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !trimmed.chars().any(char::is_whitespace)
            }
            None => false,
        };

        if !valid {
            return Err(TextError::InvalidEmail(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> serde::Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EmailAddress::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Anirudh ").expect("valid text");
        assert_eq!(text.as_str(), "Anirudh");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
    }

    #[test]
    fn user_id_keeps_inner_characters_verbatim() {
        let id = UserId::new(" 12345 ").expect("valid user id");
        assert_eq!(id.as_str(), "12345");
        assert_ne!(id, UserId::new("012345").expect("valid user id"));
    }

    #[test]
    fn email_requires_local_and_domain() {
        assert!(EmailAddress::parse("APM@gmail.com").is_ok());
        assert!(matches!(
            EmailAddress::parse("no-at-sign"),
            Err(TextError::InvalidEmail(_))
        ));
        assert!(matches!(
            EmailAddress::parse("@gmail.com"),
            Err(TextError::InvalidEmail(_))
        ));
        assert!(matches!(
            EmailAddress::parse("a b@gmail.com"),
            Err(TextError::InvalidEmail(_))
        ));
    }

    #[test]
    fn email_preserves_case() {
        let email = EmailAddress::parse("APM@Gmail.com").expect("valid email");
        assert_eq!(email.as_str(), "APM@Gmail.com");
    }

    #[test]
    fn deserialize_rejects_invalid_values() {
        let err = serde_json::from_str::<EmailAddress>("\"nope\"").expect_err("invalid email");
        assert!(err.to_string().contains("Invalid email address"));

        let err = serde_json::from_str::<UserId>("\"  \"").expect_err("empty user id");
        assert!(err.to_string().contains("empty"));
    }
}
