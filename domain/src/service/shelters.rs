use std::sync::Arc;

use super::WriteLock;
use crate::ids::{next_id, EntityKind};
use crate::validate::{field, validate};
use crate::{CoreError, Identity, RecordStore, Shelter, ShelterPayload, UpdateShelterPayload};

/// Shelter registrations: creation, owner lookup and contact updates.
pub struct ShelterService<S: RecordStore> {
    store: Arc<S>,
    writes: WriteLock,
}

impl<S: RecordStore> Clone for ShelterService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            writes: self.writes.clone(),
        }
    }
}

impl<S: RecordStore> ShelterService<S> {
    pub fn new(store: Arc<S>, writes: WriteLock) -> Self {
        Self { store, writes }
    }

    /// Register a shelter owned by `caller`.
    pub fn create(&self, caller: &Identity, payload: ShelterPayload) -> Result<Shelter, CoreError> {
        validate(&payload)?;
        let _guard = self.writes.acquire()?;
        let shelter = Shelter {
            id: next_id(&*self.store, EntityKind::Shelter)?,
            principal: caller.clone(),
            name: field(payload.name),
            location: field(payload.location),
            phone_number: field(payload.phone_number),
            email: field(payload.email),
            pets: Vec::new(),
        };
        self.store.shelters().insert(&shelter.id, shelter.clone())?;
        Ok(shelter)
    }

    pub fn get(&self, id: &str) -> Result<Option<Shelter>, CoreError> {
        self.store.shelters().get(id)
    }

    pub fn list(&self) -> Result<Vec<Shelter>, CoreError> {
        self.store.shelters().values()
    }

    pub fn get_owner(&self, caller: &Identity) -> Result<Shelter, CoreError> {
        self.store
            .shelters()
            .values()?
            .into_iter()
            .find(|s| &s.principal == caller)
            .ok_or_else(|| CoreError::NotFound(format!("no shelter owned by {}", caller)))
    }

    /// Overwrite the contact fields, keeping everything else.
    pub fn update_info(&self, payload: UpdateShelterPayload) -> Result<Shelter, CoreError> {
        let _guard = self.writes.acquire()?;
        let mut shelter = self
            .store
            .shelters()
            .get(&payload.shelter_id)?
            .ok_or_else(|| not_found(&payload.shelter_id))?;
        shelter.phone_number = payload.phone_number;
        shelter.email = payload.email;
        self.store.shelters().insert(&shelter.id, shelter.clone())?;
        Ok(shelter)
    }

    pub fn delete(&self, id: &str) -> Result<String, CoreError> {
        let _guard = self.writes.acquire()?;
        if self.store.shelters().remove(id)? {
            Ok(format!("shelter with id={} deleted", id))
        } else {
            Err(not_found(id))
        }
    }
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound(format!("shelter with id={} not found", id))
}
