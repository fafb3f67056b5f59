use std::sync::Arc;

use super::WriteLock;
use crate::ids::{next_id, EntityKind};
use crate::validate::{field, validate};
use crate::{CoreError, Identity, RecordStore, User, UserPayload};

/// Registers adopters and answers "which user is the caller" lookups.
pub struct UserService<S: RecordStore> {
    store: Arc<S>,
    writes: WriteLock,
}

impl<S: RecordStore> Clone for UserService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            writes: self.writes.clone(),
        }
    }
}

impl<S: RecordStore> UserService<S> {
    pub fn new(store: Arc<S>, writes: WriteLock) -> Self {
        Self { store, writes }
    }

    /// Create a user owned by `caller` with an empty application list.
    pub fn add(&self, caller: &Identity, payload: UserPayload) -> Result<User, CoreError> {
        validate(&payload)?;
        let _guard = self.writes.acquire()?;
        let user = User {
            id: next_id(&*self.store, EntityKind::User)?,
            principal: caller.clone(),
            name: field(payload.name),
            phone_number: field(payload.phone_number),
            email: field(payload.email),
            address: field(payload.address),
            application: Vec::new(),
        };
        self.store.users().insert(&user.id, user.clone())?;
        Ok(user)
    }

    pub fn get(&self, id: &str) -> Result<Option<User>, CoreError> {
        self.store.users().get(id)
    }

    pub fn list(&self) -> Result<Vec<User>, CoreError> {
        self.store.users().values()
    }

    /// First user whose principal is the caller.
    pub fn get_owner(&self, caller: &Identity) -> Result<User, CoreError> {
        self.store
            .users()
            .values()?
            .into_iter()
            .find(|u| &u.principal == caller)
            .ok_or_else(|| CoreError::NotFound(format!("no user owned by {}", caller)))
    }

    /// Remove a user. Adoption records referencing it are left untouched.
    pub fn delete(&self, id: &str) -> Result<String, CoreError> {
        let _guard = self.writes.acquire()?;
        if self.store.users().remove(id)? {
            Ok(format!("user with id={} deleted", id))
        } else {
            Err(CoreError::NotFound(format!("user with id={} not found", id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::service::testing::{caller, services, user_payload};
    use crate::{CoreError, Identity};

    #[test]
    fn add_assigns_id_principal_and_empty_application() {
        let svc = services();
        let user = svc.users.add(&caller(), user_payload("Ann")).unwrap();
        assert_eq!(user.id, "ID-1");
        assert_eq!(user.principal, caller());
        assert!(user.application.is_empty());
        assert_eq!(svc.users.get("ID-1").unwrap(), Some(user));
    }

    #[test]
    fn add_with_empty_field_writes_nothing() {
        let svc = services();
        let mut payload = user_payload("Ann");
        payload.phone_number = Some(String::new());
        let err = svc.users.add(&caller(), payload).unwrap_err();
        assert_eq!(err, CoreError::EmptyField("phoneNumber".into()));
        assert!(svc.users.list().unwrap().is_empty());

        // A rejected payload does not burn an id.
        let user = svc.users.add(&caller(), user_payload("Bo")).unwrap();
        assert_eq!(user.id, "ID-1");
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let svc = services();
        for name in ["A", "B", "C"] {
            svc.users.add(&caller(), user_payload(name)).unwrap();
        }
        svc.users.delete("ID-2").unwrap();
        let fourth = svc.users.add(&caller(), user_payload("D")).unwrap();
        assert_eq!(fourth.id, "ID-4");

        let ids: Vec<_> = svc.users.list().unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec!["ID-1", "ID-3", "ID-4"]);
        assert!(svc.users.get("ID-2").unwrap().is_none());
    }

    #[test]
    fn get_owner_matches_caller() {
        let svc = services();
        svc.users
            .add(&Identity::new("someone-else"), user_payload("Other"))
            .unwrap();
        let mine = svc.users.add(&caller(), user_payload("Mine")).unwrap();
        assert_eq!(svc.users.get_owner(&caller()).unwrap(), mine);

        let err = svc.users.get_owner(&Identity::anonymous()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn delete_twice_fails_second_time() {
        let svc = services();
        let user = svc.users.add(&caller(), user_payload("Ann")).unwrap();
        assert!(svc.users.delete(&user.id).is_ok());
        let err = svc.users.delete(&user.id).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(ref m) if m.contains("ID-1")));
        assert!(svc.users.list().unwrap().is_empty());
    }

    #[test]
    fn concurrent_adds_get_distinct_ids() {
        let svc = std::sync::Arc::new(services());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .map(|_| svc.users.add(&caller(), user_payload("Ann")).unwrap().id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 80);
        assert_eq!(svc.users.list().unwrap().len(), 80);
    }

    #[test]
    fn get_missing_is_none() {
        let svc = services();
        assert!(svc.users.get("ID-99").unwrap().is_none());
    }
}
