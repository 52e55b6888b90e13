//! Shared fixtures and repository properties for integration tests.
//!
//! Every property is written against the `Repository` contract so the
//! relational and document suites assert the same behaviour.

use datastore::domain::{Entity, EntityId, Upsertable};
use serde::{Deserialize, Serialize};

pub mod properties;

/// Test entity stored by both repositories.
///
/// `is_new` is transient: it is not serialised and does not take part in
/// equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub title: String,
    pub pinned: bool,
    #[serde(skip)]
    pub is_new: bool,
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.title == other.title && self.pinned == other.pinned
    }
}

impl Entity for Note {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Upsertable for Note {
    fn is_new(&self) -> bool {
        self.is_new
    }
}

/// A note that has never been stored.
pub fn fresh_note(title: &str) -> Note {
    Note {
        id: EntityId::random(),
        title: title.to_owned(),
        pinned: false,
        is_new: true,
    }
}

/// A note as loaded from a store.
pub fn stored_note(title: &str) -> Note {
    Note {
        is_new: false,
        ..fresh_note(title)
    }
}

/// `count` stored notes titled `note-00`, `note-01`, ...
pub fn stored_notes(count: usize) -> Vec<Note> {
    (0..count)
        .map(|index| stored_note(&format!("note-{index:02}")))
        .collect()
}
