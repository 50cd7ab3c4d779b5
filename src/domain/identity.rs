use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};
use uuid::Uuid;

/// Opaque identity of a card, column or tree node (e.g., `todo`, `card-3f2a…`, `root-0`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Identity {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Identity {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Generates collision-resistant identities for newly created cards, columns and nodes.
///
/// Identities take the shape `<prefix>-<uuid>` so they stay readable in exported
/// documents while never depending on the wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generates a fresh identity under the given prefix
    pub fn generate(&self, prefix: &str) -> Identity {
        Identity(format!("{}-{}", prefix, Uuid::new_v4().simple()))
    }

    pub fn card_id(&self) -> Identity {
        self.generate("card")
    }

    pub fn column_id(&self) -> Identity {
        self.generate("column")
    }

    /// Child node identities are namespaced under their parent
    pub fn child_id(&self, parent: &Identity) -> Identity {
        self.generate(parent.as_str())
    }
}
