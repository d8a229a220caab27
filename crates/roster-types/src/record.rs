use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::School;

/// Identifier assigned to a record by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RecordId)
    }
}

/// Text handle of an authenticated user, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every field of a student record except its id.
///
/// This is the payload of create and update calls, and the draft edited by
/// the form. The default value is the blank form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFields {
    pub first_name: String,
    pub last_name: String,
    pub fathers_name: String,
    pub mothers_name: String,
    pub phone_number: String,
    pub email: String,
    pub school: School,
}

impl StudentFields {
    /// Returns the wire names of required text fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("fathersName", &self.fathers_name),
            ("mothersName", &self.mothers_name),
            ("phoneNumber", &self.phone_number),
            ("email", &self.email),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A student record as held by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: StudentFields,
}

impl StudentRecord {
    pub fn new(id: RecordId, fields: StudentFields) -> Self {
        Self { id, fields }
    }
}
