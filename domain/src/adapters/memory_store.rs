use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::{
    AdoptionRecord, CoreError, EntityKind, Pet, RecordStore, Shelter, Table, User, Write,
    WriteBatch,
};

/// Rows of one table. Each row remembers the position it was first inserted
/// at so `values` can return insertion order; upserts keep that position.
struct Rows<V> {
    next_pos: u64,
    rows: BTreeMap<String, (u64, V)>,
}

impl<V: Clone> Rows<V> {
    fn new() -> Self {
        Self {
            next_pos: 0,
            rows: BTreeMap::new(),
        }
    }

    fn insert(&mut self, key: &str, value: V) -> Option<V> {
        if let Some((_, slot)) = self.rows.get_mut(key) {
            return Some(std::mem::replace(slot, value));
        }
        let pos = self.next_pos;
        self.next_pos += 1;
        self.rows.insert(key.to_string(), (pos, value));
        None
    }

    fn values(&self) -> Vec<V> {
        let mut items: Vec<_> = self.rows.values().collect();
        items.sort_by_key(|(pos, _)| *pos);
        items.into_iter().map(|(_, v)| v.clone()).collect()
    }
}

/// In-memory table guarded by its own mutex.
pub struct MemoryTable<V> {
    inner: Mutex<Rows<V>>,
}

impl<V: Clone> MemoryTable<V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Rows::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Rows<V>>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

impl<V: Clone> Default for MemoryTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send> Table<V> for MemoryTable<V> {
    fn insert(&self, key: &str, value: V) -> Result<Option<V>, CoreError> {
        Ok(self.lock()?.insert(key, value))
    }

    fn get(&self, key: &str) -> Result<Option<V>, CoreError> {
        Ok(self.lock()?.rows.get(key).map(|(_, v)| v.clone()))
    }

    fn values(&self) -> Result<Vec<V>, CoreError> {
        Ok(self.lock()?.values())
    }

    fn remove(&self, key: &str) -> Result<bool, CoreError> {
        Ok(self.lock()?.rows.remove(key).is_some())
    }
}

/// In-memory record store for tests and local runs. Data is lost on restart.
pub struct MemoryStore {
    users: MemoryTable<User>,
    pets: MemoryTable<Pet>,
    shelters: MemoryTable<Shelter>,
    adoptions: MemoryTable<AdoptionRecord>,
    counters: Mutex<BTreeMap<EntityKind, u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: MemoryTable::new(),
            pets: MemoryTable::new(),
            shelters: MemoryTable::new(),
            adoptions: MemoryTable::new(),
            counters: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn users(&self) -> &dyn Table<User> {
        &self.users
    }

    fn pets(&self) -> &dyn Table<Pet> {
        &self.pets
    }

    fn shelters(&self) -> &dyn Table<Shelter> {
        &self.shelters
    }

    fn adoptions(&self) -> &dyn Table<AdoptionRecord> {
        &self.adoptions
    }

    fn next_sequence(&self, kind: EntityKind) -> Result<u64, CoreError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| CoreError::Repository("counter mutex".into()))?;
        let value = counters.entry(kind).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), CoreError> {
        // Take every table lock up front, always in the same order, so the
        // batch is applied with no reader seeing half of it.
        let mut users = self.users.lock()?;
        let mut pets = self.pets.lock()?;
        let mut shelters = self.shelters.lock()?;
        let mut adoptions = self.adoptions.lock()?;
        for write in batch.into_writes() {
            match write {
                Write::User(u) => {
                    users.insert(&u.id.clone(), u);
                }
                Write::Pet(p) => {
                    pets.insert(&p.id.clone(), p);
                }
                Write::Shelter(s) => {
                    shelters.insert(&s.id.clone(), s);
                }
                Write::Adoption(a) => {
                    adoptions.insert(&a.adoption_id.clone(), a);
                }
            }
        }
        Ok(())
    }
}
