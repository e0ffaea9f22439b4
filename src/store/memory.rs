//! In-memory store, used when no database is configured and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewUser, StoreError, User, UserStore};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(all)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        // Uniqueness check and insert under one write lock.
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail(user.email));
        }
        let stored = User {
            id: Uuid::new_v4(),
            full_name: user.full_name,
            email: user.email,
            password_hash: user.password_hash,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        };
        users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::DuplicateEmail(user.email));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        match self.users.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::store::UserStatus;

    fn new_user(email: &str) -> NewUser {
        let now = OffsetDateTime::now_utc();
        NewUser {
            full_name: "Ada Lovelace".into(),
            email: email.into(),
            password_hash: "$argon2id$fake".into(),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_get_round_trips() {
        let store = MemoryStore::new();
        let stored = store.insert(new_user("ada@example.com")).await.expect("insert");
        let found = store.get(stored.id).await.expect("get").expect("present");
        assert_eq!(found.email, "ada@example.com");
        assert_eq!(found.id, stored.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_on_insert() {
        let store = MemoryStore::new();
        store.insert(new_user("ada@example.com")).await.expect("first insert");
        let err = store.insert(new_user("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));
        assert_eq!(store.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn update_rejects_email_taken_by_another_record() {
        let store = MemoryStore::new();
        store.insert(new_user("ada@example.com")).await.expect("insert");
        let mut second = store.insert(new_user("grace@example.com")).await.expect("insert");
        second.email = "ada@example.com".into();
        let err = store.update(second).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let mut user = store.insert(new_user("ada@example.com")).await.expect("insert");
        store.delete(user.id).await.expect("delete");
        user.full_name = "Ada K".into();
        assert!(matches!(store.update(user).await.unwrap_err(), StoreError::NotFound));
    }

    #[tokio::test]
    async fn delete_removes_visibility() {
        let store = MemoryStore::new();
        let user = store.insert(new_user("ada@example.com")).await.expect("insert");
        store.delete(user.id).await.expect("delete");
        assert!(store.get(user.id).await.expect("get").is_none());
        assert!(store.list().await.expect("list").is_empty());
        assert!(matches!(store.delete(user.id).await.unwrap_err(), StoreError::NotFound));
    }

    #[tokio::test]
    async fn list_is_ordered_by_creation() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let mut u = new_user(&format!("user{i}@example.com"));
            u.created_at = OffsetDateTime::from_unix_timestamp(1_700_000_000 + i).expect("ts");
            u.updated_at = u.created_at;
            store.insert(u).await.expect("insert");
        }
        let listed = store.list().await.expect("list");
        let emails: Vec<_> = listed.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(
            emails,
            vec![
                "user0@example.com",
                "user1@example.com",
                "user2@example.com",
                "user3@example.com",
                "user4@example.com",
            ]
        );
    }
}
