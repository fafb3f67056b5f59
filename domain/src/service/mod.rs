//! Application services, one per entity, composing the record store, the id
//! generator and the validator.
//!
//! Every mutating call runs under one write lock shared by the four services,
//! which keeps id reservation and read-modify-write merges free of lost
//! updates. Reads go straight to the store.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{Clock, CoreError, RecordStore};

pub mod adoptions;
pub mod pets;
pub mod shelters;
pub mod users;

pub use adoptions::AdoptionService;
pub use pets::PetService;
pub use shelters::ShelterService;
pub use users::UserService;

/// Serializes mutations across all services sharing it.
#[derive(Clone, Default)]
pub struct WriteLock(Arc<Mutex<()>>);

impl WriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn acquire(&self) -> Result<MutexGuard<'_, ()>, CoreError> {
        self.0
            .lock()
            .map_err(|_| CoreError::Repository("write lock poisoned".into()))
    }
}

/// The four entity services wired to one store and one write lock.
pub struct Services<S: RecordStore, C: Clock> {
    pub users: UserService<S>,
    pub pets: PetService<S>,
    pub shelters: ShelterService<S>,
    pub adoptions: AdoptionService<S, C>,
}

impl<S: RecordStore, C: Clock> Services<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        let store = Arc::new(store);
        let writes = WriteLock::new();
        Self {
            users: UserService::new(store.clone(), writes.clone()),
            pets: PetService::new(store.clone(), writes.clone()),
            shelters: ShelterService::new(store.clone(), writes.clone()),
            adoptions: AdoptionService::new(store, clock, writes),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use super::Services;
    use crate::adapters::memory_store::MemoryStore;
    use crate::{Clock, Identity, PetPayload, ShelterPayload, UserPayload};

    pub struct TestClock;
    impl Clock for TestClock {
        fn now(&self) -> SystemTime {
            UNIX_EPOCH + Duration::from_secs(1_700_000_000)
        }
    }

    pub fn services() -> Services<MemoryStore, TestClock> {
        Services::new(MemoryStore::new(), TestClock)
    }

    pub fn caller() -> Identity {
        Identity::new("aaaaa-aa")
    }

    pub fn user_payload(name: &str) -> UserPayload {
        UserPayload {
            name: Some(name.to_string()),
            phone_number: Some("555-0100".into()),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            address: Some("1 Main St".into()),
        }
    }

    pub fn pet_payload(name: &str, species: &str, shelter_id: &str) -> PetPayload {
        PetPayload {
            name: Some(name.to_string()),
            species: Some(species.to_string()),
            breed: Some("mixed".into()),
            gender: Some("female".into()),
            age: Some("2".into()),
            pet_image: Some(format!("{}.png", name.to_lowercase())),
            description: Some("friendly".into()),
            health_status: Some("healthy".into()),
            shelter_id: Some(shelter_id.to_string()),
        }
    }

    pub fn shelter_payload(name: &str) -> ShelterPayload {
        ShelterPayload {
            name: Some(name.to_string()),
            location: Some("Oslo".into()),
            phone_number: Some("555-0199".into()),
            email: Some("shelter@example.com".into()),
        }
    }
}
