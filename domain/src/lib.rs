//! Domain library for the pet adoption records service.
//!
//! This crate keeps its dependencies to `serde` and holds the records, the
//! creation/update payloads, the storage ports (traits) and the error type.
//! Keep adapters and IO concerns out of this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub use ids::EntityKind;

/// Opaque identity of the caller of an operation.
///
/// Only equality is meaningful. The hosting transport is trusted to have
/// authenticated whatever token this wraps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Textual form of the anonymous caller.
    pub const ANONYMOUS: &'static str = "2vxsx-fae";

    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Adoption state of a pet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PetStatus {
    #[default]
    NotAdopted,
    Adopted,
}

impl PetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PetStatus::NotAdopted => "notAdopted",
            PetStatus::Adopted => "adopted",
        }
    }
}

/// Lifecycle state of an adoption application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdoptionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl AdoptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdoptionStatus::Pending => "pending",
            AdoptionStatus::Completed => "completed",
            AdoptionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AdoptionStatus::Pending)
    }
}

/// A registered adopter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub principal: Identity,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub address: String,
    /// Ids of adoption records filed by this user, oldest first. Never pruned.
    pub application: Vec<String>,
}

/// A pet listed by a shelter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: String,
    pub name: String,
    pub species: String,
    pub breed: String,
    pub gender: String,
    pub age: String,
    pub pet_image: String,
    pub description: String,
    pub health_status: String,
    pub shelter_id: String,
    /// Absent on rows written by `PetService::set_image`. Such rows are
    /// neither adopted nor available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PetStatus>,
}

impl Pet {
    /// A row holding nothing but an id and an image, with no status. This is
    /// what `PetService::set_image` writes over an existing pet.
    pub fn image_only(id: String, pet_image: String) -> Self {
        Self {
            id,
            pet_image,
            ..Self::default()
        }
    }
}

/// A shelter that lists pets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shelter {
    pub id: String,
    pub principal: Identity,
    pub name: String,
    pub location: String,
    pub phone_number: String,
    pub email: String,
    /// Declared for clients; no operation populates it.
    pub pets: Vec<String>,
}

/// An adoption application. User and pet fields are copied when the
/// application is filed and are not kept in sync afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptionRecord {
    pub adoption_id: String,
    pub user_id: String,
    pub pet_id: String,
    pub pet_name: String,
    pub user_name: String,
    pub user_phone_number: String,
    pub address: String,
    pub reason_for_adoption: String,
    /// Nanoseconds since the UNIX epoch, in decimal.
    pub date_of_adoption: String,
    pub status: AdoptionStatus,
}

/// A record stored under a unique string key in one of the tables.
pub trait Record: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn key(&self) -> &str;
}

impl Record for User {
    const KIND: EntityKind = EntityKind::User;

    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for Pet {
    const KIND: EntityKind = EntityKind::Pet;

    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for Shelter {
    const KIND: EntityKind = EntityKind::Shelter;

    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for AdoptionRecord {
    const KIND: EntityKind = EntityKind::Adoption;

    fn key(&self) -> &str {
        &self.adoption_id
    }
}

// ============================================================================
// Payloads
// ============================================================================
//
// Creation payloads keep every field optional so that a missing field and an
// empty one are both reported as `CoreError::EmptyField` by the validator.

/// Input for `UserService::add`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPayload {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Input for `PetService::add`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PetPayload {
    pub name: Option<String>,
    pub species: Option<String>,
    pub breed: Option<String>,
    pub gender: Option<String>,
    pub age: Option<String>,
    pub pet_image: Option<String>,
    pub description: Option<String>,
    pub health_status: Option<String>,
    pub shelter_id: Option<String>,
}

/// Input for `PetService::set_image`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PetImagePayload {
    pub pet_id: Option<String>,
    pub pet_image: Option<String>,
}

/// Input for `PetService::update_info`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePetPayload {
    pub pet_id: String,
    pub health_status: String,
    pub age: String,
}

/// Input for `ShelterService::create`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShelterPayload {
    pub name: Option<String>,
    pub location: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

/// Input for `ShelterService::update_info`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShelterPayload {
    pub shelter_id: String,
    pub phone_number: String,
    pub email: String,
}

/// Input for `AdoptionService::file`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdoptionPayload {
    pub user_id: Option<String>,
    pub pet_id: Option<String>,
    pub reason_for_adoption: Option<String>,
}

/// Input for `AdoptionService::update`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdoptionPayload {
    pub adoption_id: String,
    pub user_name: String,
    pub user_phone_number: String,
    pub address: String,
    pub reason_for_adoption: String,
}

// ============================================================================
// Ports
// ============================================================================

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// One key→record table.
pub trait Table<V>: Send + Sync {
    /// Upsert `value` under `key`, returning the row it replaced.
    fn insert(&self, key: &str, value: V) -> Result<Option<V>, CoreError>;
    fn get(&self, key: &str) -> Result<Option<V>, CoreError>;
    /// All rows, in insertion order.
    fn values(&self) -> Result<Vec<V>, CoreError>;
    /// Delete the row under `key`. Returns `false` when there was none.
    fn remove(&self, key: &str) -> Result<bool, CoreError>;
}

/// A single upsert inside a [`WriteBatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Write {
    User(User),
    Pet(Pet),
    Shelter(Shelter),
    Adoption(AdoptionRecord),
}

/// Upserts applied all-or-nothing by [`RecordStore::commit`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

/// Storage port: four independent tables plus the per-kind id counters.
pub trait RecordStore: Send + Sync {
    fn users(&self) -> &dyn Table<User>;
    fn pets(&self) -> &dyn Table<Pet>;
    fn shelters(&self) -> &dyn Table<Shelter>;
    fn adoptions(&self) -> &dyn Table<AdoptionRecord>;
    /// Atomically increment the counter for `kind` and return the new value.
    fn next_sequence(&self, kind: EntityKind) -> Result<u64, CoreError>;
    /// Apply every write in `batch`, or none of them.
    fn commit(&self, batch: WriteBatch) -> Result<(), CoreError>;
}

/// Core domain errors (no external error crates to keep deps minimal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A referenced id is absent. The message names it.
    NotFound(String),
    /// Reserved for payloads that are well-formed but unacceptable.
    InvalidPayload(String),
    /// A required field is missing or empty. Holds the field name.
    EmptyField(String),
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::NotFound(msg) => write!(f, "not found: {}", msg),
            CoreError::InvalidPayload(msg) => write!(f, "invalid payload: {}", msg),
            CoreError::EmptyField(field) => write!(f, "{} is required", field),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

pub mod adapters;
pub mod ids;
pub mod service;
pub mod validate;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_compares_by_value() {
        assert_eq!(Identity::new("abc"), Identity::new("abc"));
        assert_ne!(Identity::new("abc"), Identity::anonymous());
        assert_eq!(Identity::anonymous().as_str(), Identity::ANONYMOUS);
    }

    #[test]
    fn statuses_serialize_in_camel_case() {
        assert_eq!(
            serde_json::to_string(&PetStatus::NotAdopted).unwrap(),
            "\"notAdopted\""
        );
        assert_eq!(
            serde_json::to_string(&AdoptionStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(PetStatus::default().as_str(), "notAdopted");
        assert!(AdoptionStatus::Failed.is_terminal());
        assert!(!AdoptionStatus::Pending.is_terminal());
    }

    #[test]
    fn pet_serializes_camel_case_fields() {
        let pet = Pet::image_only("ID-1".into(), "cat.png".into());
        let v = serde_json::to_value(&pet).unwrap();
        assert_eq!(v["petImage"], "cat.png");
        assert_eq!(v["healthStatus"], "");
        assert!(v.get("status").is_none());

        let back: Pet = serde_json::from_value(v).unwrap();
        assert_eq!(back.status, None);
    }

    #[test]
    fn payload_tolerates_missing_fields() {
        let p: UserPayload = serde_json::from_str(r#"{"name":"Ann"}"#).unwrap();
        assert_eq!(p.name.as_deref(), Some("Ann"));
        assert!(p.email.is_none());
    }

    #[test]
    fn empty_field_display_names_the_field() {
        let e = CoreError::EmptyField("phoneNumber".into());
        assert_eq!(e.to_string(), "phoneNumber is required");
    }
}
