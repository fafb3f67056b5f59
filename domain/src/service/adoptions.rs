use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{pets, WriteLock};
use crate::ids::{next_id, EntityKind};
use crate::validate::{field, validate};
use crate::{
    AdoptionPayload, AdoptionRecord, AdoptionStatus, Clock, CoreError, PetStatus, RecordStore,
    UpdateAdoptionPayload, Write, WriteBatch,
};

/// Adoption applications and their pending → completed/failed lifecycle.
pub struct AdoptionService<S: RecordStore, C: Clock> {
    store: Arc<S>,
    clock: C,
    writes: WriteLock,
}

impl<S: RecordStore, C: Clock + Clone> Clone for AdoptionService<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            writes: self.writes.clone(),
        }
    }
}

impl<S: RecordStore, C: Clock> AdoptionService<S, C> {
    pub fn new(store: Arc<S>, clock: C, writes: WriteLock) -> Self {
        Self {
            store,
            clock,
            writes,
        }
    }

    /// File an application by `userId` for `petId`.
    ///
    /// Both must exist. The record snapshots the pet name and the user's
    /// contact details, and its id is appended to the user's application
    /// list. The record and the updated user are committed together.
    pub fn file(&self, payload: AdoptionPayload) -> Result<AdoptionRecord, CoreError> {
        validate(&payload)?;
        let user_id = field(payload.user_id);
        let pet_id = field(payload.pet_id);

        let _guard = self.writes.acquire()?;
        let mut user = self
            .store
            .users()
            .get(&user_id)?
            .ok_or_else(|| CoreError::NotFound(format!("user with id={} not found", user_id)))?;
        let pet = self
            .store
            .pets()
            .get(&pet_id)?
            .ok_or_else(|| pets::not_found(&pet_id))?;

        let record = AdoptionRecord {
            adoption_id: next_id(&*self.store, EntityKind::Adoption)?,
            user_id: user.id.clone(),
            pet_id: pet.id,
            pet_name: pet.name,
            user_name: user.name.clone(),
            user_phone_number: user.phone_number.clone(),
            address: user.address.clone(),
            reason_for_adoption: field(payload.reason_for_adoption),
            date_of_adoption: timestamp(self.clock.now()),
            status: AdoptionStatus::Pending,
        };
        user.application.push(record.adoption_id.clone());

        self.store.commit(
            WriteBatch::new()
                .put(Write::Adoption(record.clone()))
                .put(Write::User(user)),
        )?;
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<Option<AdoptionRecord>, CoreError> {
        self.store.adoptions().get(id)
    }

    pub fn list(&self) -> Result<Vec<AdoptionRecord>, CoreError> {
        self.store.adoptions().values()
    }

    /// Overwrite the applicant-editable fields, keeping ids, date and status.
    pub fn update(&self, payload: UpdateAdoptionPayload) -> Result<AdoptionRecord, CoreError> {
        let _guard = self.writes.acquire()?;
        let mut record = self.require(&payload.adoption_id)?;
        record.user_name = payload.user_name;
        record.user_phone_number = payload.user_phone_number;
        record.address = payload.address;
        record.reason_for_adoption = payload.reason_for_adoption;
        self.store
            .adoptions()
            .insert(&record.adoption_id, record.clone())?;
        Ok(record)
    }

    /// Mark the application completed and its pet adopted, in one commit.
    ///
    /// A record that is already completed or failed is returned unchanged,
    /// without looking at its pet.
    pub fn complete(&self, id: &str) -> Result<AdoptionRecord, CoreError> {
        let _guard = self.writes.acquire()?;
        let mut record = self.require(id)?;
        if record.status.is_terminal() {
            return Ok(record);
        }
        let mut pet = self
            .store
            .pets()
            .get(&record.pet_id)?
            .ok_or_else(|| pets::not_found(&record.pet_id))?;

        record.status = AdoptionStatus::Completed;
        pet.status = Some(PetStatus::Adopted);
        self.store.commit(
            WriteBatch::new()
                .put(Write::Adoption(record.clone()))
                .put(Write::Pet(pet)),
        )?;
        Ok(record)
    }

    /// Mark the application failed. The pet is left as it is.
    ///
    /// A record that is already completed or failed is returned unchanged.
    pub fn fail(&self, id: &str) -> Result<AdoptionRecord, CoreError> {
        let _guard = self.writes.acquire()?;
        let mut record = self.require(id)?;
        if record.status.is_terminal() {
            return Ok(record);
        }
        record.status = AdoptionStatus::Failed;
        self.store
            .adoptions()
            .insert(&record.adoption_id, record.clone())?;
        Ok(record)
    }

    fn require(&self, id: &str) -> Result<AdoptionRecord, CoreError> {
        self.store.adoptions().get(id)?.ok_or_else(|| {
            CoreError::NotFound(format!("adoption record with id={} not found", id))
        })
    }
}

/// Nanoseconds since the UNIX epoch, in decimal.
fn timestamp(t: SystemTime) -> String {
    t.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos()
        .to_string()
}
