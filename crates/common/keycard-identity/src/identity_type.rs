use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The kind of identity a card binds its public key to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityType {
    Email,
    Phone,
    Application,
    /// Any other, application-defined identity kind. Never empty.
    Custom(String),
}

impl IdentityType {
    pub fn as_str(&self) -> &str {
        match self {
            IdentityType::Email => "email",
            IdentityType::Phone => "phone",
            IdentityType::Application => "application",
            IdentityType::Custom(s) => s,
        }
    }
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityType {
    type Err = crate::IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(crate::IdentityError::invalid_field(
                "identity_type",
                "must not be empty",
            )),
            "email" => Ok(IdentityType::Email),
            "phone" => Ok(IdentityType::Phone),
            "application" => Ok(IdentityType::Application),
            other => Ok(IdentityType::Custom(other.to_string())),
        }
    }
}

impl Serialize for IdentityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IdentityType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Visibility of a card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardScope {
    /// Visible only within the issuing application.
    #[default]
    Application,
    Global,
}

impl CardScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardScope::Application => "application",
            CardScope::Global => "global",
        }
    }
}

impl fmt::Display for CardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardScope {
    type Err = crate::IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application" => Ok(CardScope::Application),
            "global" => Ok(CardScope::Global),
            other => Err(crate::IdentityError::invalid_field(
                "scope",
                format!("unknown scope `{}`", other),
            )),
        }
    }
}
