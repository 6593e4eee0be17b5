use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::SystemTime;

/// Strongly typed diagnostic event identifier backed by ULID.
///
/// ULIDs sort by creation time, so a stream of events ordered by id is also
/// ordered by emission time.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct DiagnosticId(pub ulid::Ulid);

impl DiagnosticId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn from_ulid(id: ulid::Ulid) -> Self {
        Self(id)
    }

    /// Wall-clock time encoded in the id.
    pub fn timestamp(&self) -> SystemTime {
        self.0.datetime()
    }
}

impl Default for DiagnosticId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DiagnosticId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DiagnosticId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = ulid::Ulid::from_string(s)?;
        Ok(DiagnosticId(id))
    }
}

impl Serialize for DiagnosticId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DiagnosticId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<DiagnosticId>()
            .map_err(|_| serde::de::Error::custom("invalid diagnostic id"))
    }
}
