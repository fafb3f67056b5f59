//! Required-field validation for creation payloads. Keep logic minimal and
//! deterministic: fields are checked in declaration order and the first
//! missing or empty one is reported.

use crate::{AdoptionPayload, CoreError, PetImagePayload, PetPayload, ShelterPayload, UserPayload};

/// A payload that declares which of its fields must be non-empty.
pub trait RequiredFields {
    /// `(field name, value)` pairs in the order they should be checked.
    fn required_fields(&self) -> Vec<(&'static str, Option<&str>)>;
}

/// Fail with `EmptyField` on the first required field that is missing or empty.
pub fn validate<P: RequiredFields + ?Sized>(payload: &P) -> Result<(), CoreError> {
    for (name, value) in payload.required_fields() {
        if value.map_or(true, str::is_empty) {
            return Err(CoreError::EmptyField(name.to_string()));
        }
    }
    Ok(())
}

/// Unwrap a field that `validate` has already checked.
pub(crate) fn field(value: Option<String>) -> String {
    value.unwrap_or_default()
}

impl RequiredFields for UserPayload {
    fn required_fields(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("name", self.name.as_deref()),
            ("phoneNumber", self.phone_number.as_deref()),
            ("email", self.email.as_deref()),
            ("address", self.address.as_deref()),
        ]
    }
}

impl RequiredFields for PetPayload {
    fn required_fields(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("name", self.name.as_deref()),
            ("species", self.species.as_deref()),
            ("breed", self.breed.as_deref()),
            ("gender", self.gender.as_deref()),
            ("age", self.age.as_deref()),
            ("petImage", self.pet_image.as_deref()),
            ("description", self.description.as_deref()),
            ("healthStatus", self.health_status.as_deref()),
            ("shelterId", self.shelter_id.as_deref()),
        ]
    }
}

impl RequiredFields for PetImagePayload {
    fn required_fields(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("petId", self.pet_id.as_deref()),
            ("petImage", self.pet_image.as_deref()),
        ]
    }
}

impl RequiredFields for ShelterPayload {
    fn required_fields(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("name", self.name.as_deref()),
            ("location", self.location.as_deref()),
            ("phoneNumber", self.phone_number.as_deref()),
            ("email", self.email.as_deref()),
        ]
    }
}

impl RequiredFields for AdoptionPayload {
    fn required_fields(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("userId", self.user_id.as_deref()),
            ("petId", self.pet_id.as_deref()),
            ("reasonForAdoption", self.reason_for_adoption.as_deref()),
        ]
    }
}
