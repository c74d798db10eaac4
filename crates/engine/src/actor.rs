//! The module contains the `Actor` struct.

use std::fmt;

use uuid::Uuid;

/// A participant whose balances live on both ledgers.
///
/// Sessions are keyed by `id`. The ledgers' command surfaces only know the
/// display `name`, so two actors sharing a name cannot be told apart once a
/// command line has been built.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    pub fn with_id(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
