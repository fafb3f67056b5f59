use std::sync::Arc;

use super::WriteLock;
use crate::ids::{next_id, EntityKind};
use crate::validate::{field, validate};
use crate::{
    CoreError, Pet, PetImagePayload, PetPayload, PetStatus, RecordStore, UpdatePetPayload,
};

/// Pet listings: creation, lookup, filtering and narrow updates.
pub struct PetService<S: RecordStore> {
    store: Arc<S>,
    writes: WriteLock,
}

impl<S: RecordStore> Clone for PetService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            writes: self.writes.clone(),
        }
    }
}

impl<S: RecordStore> PetService<S> {
    pub fn new(store: Arc<S>, writes: WriteLock) -> Self {
        Self { store, writes }
    }

    /// Create a pet. New pets always start as `notAdopted`.
    pub fn add(&self, payload: PetPayload) -> Result<Pet, CoreError> {
        validate(&payload)?;
        let _guard = self.writes.acquire()?;
        let pet = Pet {
            id: next_id(&*self.store, EntityKind::Pet)?,
            name: field(payload.name),
            species: field(payload.species),
            breed: field(payload.breed),
            gender: field(payload.gender),
            age: field(payload.age),
            pet_image: field(payload.pet_image),
            description: field(payload.description),
            health_status: field(payload.health_status),
            shelter_id: field(payload.shelter_id),
            status: Some(PetStatus::NotAdopted),
        };
        self.store.pets().insert(&pet.id, pet.clone())?;
        Ok(pet)
    }

    /// Store an image under `petId`.
    ///
    /// The row at that key is replaced by one holding only the id and the
    /// image: every other field of an existing pet is lost and the row has no
    /// status, so it is listed by neither status filter. The key does not
    /// have to exist beforehand.
    pub fn set_image(&self, payload: PetImagePayload) -> Result<Pet, CoreError> {
        validate(&payload)?;
        let _guard = self.writes.acquire()?;
        let pet = Pet::image_only(field(payload.pet_id), field(payload.pet_image));
        self.store.pets().insert(&pet.id, pet.clone())?;
        Ok(pet)
    }

    pub fn get(&self, id: &str) -> Result<Option<Pet>, CoreError> {
        self.store.pets().get(id)
    }

    pub fn list(&self) -> Result<Vec<Pet>, CoreError> {
        self.store.pets().values()
    }

    pub fn list_not_adopted(&self) -> Result<Vec<Pet>, CoreError> {
        Ok(self
            .store
            .pets()
            .values()?
            .into_iter()
            .filter(|p| p.status == Some(PetStatus::NotAdopted))
            .collect())
    }

    /// Pets whose species equals `species`, ignoring case.
    pub fn search_by_species(&self, species: &str) -> Result<Vec<Pet>, CoreError> {
        let wanted = species.to_lowercase();
        Ok(self
            .store
            .pets()
            .values()?
            .into_iter()
            .filter(|p| p.species.to_lowercase() == wanted)
            .collect())
    }

    /// Overwrite `healthStatus` and `age`, keeping every other field.
    pub fn update_info(&self, payload: UpdatePetPayload) -> Result<Pet, CoreError> {
        let _guard = self.writes.acquire()?;
        let mut pet = self
            .store
            .pets()
            .get(&payload.pet_id)?
            .ok_or_else(|| not_found(&payload.pet_id))?;
        pet.health_status = payload.health_status;
        pet.age = payload.age;
        self.store.pets().insert(&pet.id, pet.clone())?;
        Ok(pet)
    }

    pub fn delete(&self, id: &str) -> Result<String, CoreError> {
        let _guard = self.writes.acquire()?;
        if self.store.pets().remove(id)? {
            Ok(format!("pet with id={} deleted", id))
        } else {
            Err(not_found(id))
        }
    }
}

pub(crate) fn not_found(id: &str) -> CoreError {
    CoreError::NotFound(format!("pet with id={} not found", id))
}

#[cfg(test)]
mod tests {
    use crate::service::testing::{pet_payload, services};
    use crate::{CoreError, PetImagePayload, PetStatus, UpdatePetPayload};

    #[test]
    fn add_defaults_to_not_adopted() {
        let svc = services();
        let pet = svc.pets.add(pet_payload("Rex", "Dog", "ID-1")).unwrap();
        assert_eq!(pet.id, "ID-1");
        assert_eq!(pet.status, Some(PetStatus::NotAdopted));
        assert_eq!(pet.shelter_id, "ID-1");
    }

    #[test]
    fn add_rejects_missing_field() {
        let svc = services();
        let mut payload = pet_payload("Rex", "Dog", "ID-1");
        payload.shelter_id = None;
        let err = svc.pets.add(payload).unwrap_err();
        assert_eq!(err, CoreError::EmptyField("shelterId".into()));
        assert!(svc.pets.list().unwrap().is_empty());
    }

    #[test]
    fn update_info_touches_only_health_and_age() {
        let svc = services();
        let original = svc.pets.add(pet_payload("Rex", "Dog", "ID-1")).unwrap();
        svc.pets
            .update_info(UpdatePetPayload {
                pet_id: original.id.clone(),
                health_status: "recovering".into(),
                age: "3".into(),
            })
            .unwrap();

        let got = svc.pets.get(&original.id).unwrap().unwrap();
        assert_eq!(got.health_status, "recovering");
        assert_eq!(got.age, "3");
        assert_eq!(got.name, original.name);
        assert_eq!(got.species, original.species);
        assert_eq!(got.breed, original.breed);
        assert_eq!(got.pet_image, original.pet_image);
        assert_eq!(got.shelter_id, original.shelter_id);
        assert_eq!(got.status, original.status);
    }

    #[test]
    fn update_info_missing_pet() {
        let svc = services();
        let err = svc
            .pets
            .update_info(UpdatePetPayload {
                pet_id: "ID-5".into(),
                health_status: "ok".into(),
                age: "1".into(),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(ref m) if m.contains("ID-5")));
    }

    #[test]
    fn species_search_ignores_case() {
        let svc = services();
        svc.pets.add(pet_payload("Rex", "Dog", "ID-1")).unwrap();
        svc.pets.add(pet_payload("Tom", "cat", "ID-1")).unwrap();
        svc.pets.add(pet_payload("Fido", "DOG", "ID-1")).unwrap();
        svc.pets.add(pet_payload("Dingo", "Dogfish", "ID-1")).unwrap();

        let upper = svc.pets.search_by_species("Dog").unwrap();
        let lower = svc.pets.search_by_species("dog").unwrap();
        assert_eq!(upper, lower);
        let names: Vec<_> = upper.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Rex", "Fido"]);
    }

    #[test]
    fn set_image_replaces_whole_row() {
        let svc = services();
        let pet = svc.pets.add(pet_payload("Rex", "Dog", "ID-1")).unwrap();
        svc.pets
            .set_image(PetImagePayload {
                pet_id: Some(pet.id.clone()),
                pet_image: Some("new.png".into()),
            })
            .unwrap();

        let got = svc.pets.get(&pet.id).unwrap().unwrap();
        assert_eq!(got.pet_image, "new.png");
        assert_eq!(got.name, "");
        assert_eq!(got.species, "");
        assert_eq!(got.status, None);
        assert!(svc.pets.list_not_adopted().unwrap().is_empty());
    }

    #[test]
    fn set_image_validates_payload() {
        let svc = services();
        let err = svc
            .pets
            .set_image(PetImagePayload {
                pet_id: Some("ID-1".into()),
                pet_image: None,
            })
            .unwrap_err();
        assert_eq!(err, CoreError::EmptyField("petImage".into()));
        assert!(svc.pets.get("ID-1").unwrap().is_none());
    }

    #[test]
    fn delete_removes_from_listing() {
        let svc = services();
        let pet = svc.pets.add(pet_payload("Rex", "Dog", "ID-1")).unwrap();
        svc.pets.delete(&pet.id).unwrap();
        assert!(svc.pets.list().unwrap().is_empty());
        assert!(svc.pets.get(&pet.id).unwrap().is_none());
        assert!(matches!(
            svc.pets.delete(&pet.id),
            Err(CoreError::NotFound(_))
        ));
    }
}
