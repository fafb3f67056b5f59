//! Entity id generation. Ids are `ID-<n>` with one counter per entity kind.

use crate::{CoreError, RecordStore};

const ID_PREFIX: &str = "ID-";

/// The four record tables, also used to scope id counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    User,
    Pet,
    Shelter,
    Adoption,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::User,
        EntityKind::Pet,
        EntityKind::Shelter,
        EntityKind::Adoption,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Pet => "pet",
            EntityKind::Shelter => "shelter",
            EntityKind::Adoption => "adoption",
        }
    }
}

/// Render a counter value as an entity id.
pub fn format_id(n: u64) -> String {
    format!("{}{}", ID_PREFIX, n)
}

/// Reserve the next id for `kind`. Counter values are never handed out twice,
/// even after the row they named is deleted.
pub fn next_id<S: RecordStore + ?Sized>(store: &S, kind: EntityKind) -> Result<String, CoreError> {
    store.next_sequence(kind).map(format_id)
}
