use std::collections::BTreeMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::UserRequest;
use super::password::{hash_password, MIN_PASSWORD_LEN};
use crate::error::Error;
use crate::report::{self, RenderError};
use crate::store::{NewUser, StoreError, User, UserStatus, UserStore};

pub const MAX_FIELD_LEN: usize = 150;

/// The single parameter the report template declares.
pub const REPORT_PARAM_CREATED_BY: &str = "createdBy";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Orchestrates record mutation and report generation. Stateless between
/// calls; all durable state lives behind the store.
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn UserStore>,
    report_created_by: String,
}

fn store_err(e: StoreError) -> Error {
    match e {
        StoreError::DuplicateEmail(email) => {
            Error::Conflict(format!("email `{email}` is already registered"))
        }
        StoreError::NotFound => Error::NotFound("user"),
        StoreError::Backend(e) => Error::Internal(e),
    }
}

fn validate_fields(input: &UserRequest) -> Vec<String> {
    let mut violations = Vec::new();
    match input.full_name.as_deref().map(str::trim) {
        None | Some("") => violations.push("fullName".to_string()),
        Some(name) if name.chars().count() > MAX_FIELD_LEN => {
            violations.push("fullName".to_string())
        }
        _ => {}
    }
    match input.email.as_deref() {
        None | Some("") => violations.push("email".to_string()),
        Some(email) if email.chars().count() > MAX_FIELD_LEN || !is_valid_email(email) => {
            violations.push("email".to_string())
        }
        _ => {}
    }
    if let Some(status) = input.status.as_deref() {
        if UserStatus::parse(status).is_none() {
            violations.push("status".to_string());
        }
    }
    violations
}

fn normalize_email(input: &mut UserRequest) {
    if let Some(email) = &mut input.email {
        *email = email.trim().to_lowercase();
    }
}

impl Directory {
    pub fn new(store: Arc<dyn UserStore>, report_created_by: String) -> Self {
        Self {
            store,
            report_created_by,
        }
    }

    pub async fn list(&self) -> Result<Vec<User>, Error> {
        self.store.list().await.map_err(store_err)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, Error> {
        match self.store.get(id).await.map_err(store_err)? {
            Some(user) => Ok(user),
            None => Err(Error::NotFound("user")),
        }
    }

    pub async fn create(&self, mut input: UserRequest) -> Result<User, Error> {
        normalize_email(&mut input);
        let mut violations = validate_fields(&input);
        match input.password.as_deref() {
            None | Some("") => violations.push("password".to_string()),
            Some(p) if p.len() < MIN_PASSWORD_LEN => violations.push("password".to_string()),
            _ => {}
        }
        if !violations.is_empty() {
            warn!(?violations, "create rejected");
            return Err(Error::Validation(violations));
        }

        let password_hash = hash_password(input.password.as_deref().unwrap_or_default())?;
        let now = OffsetDateTime::now_utc();
        let user = self
            .store
            .insert(NewUser {
                full_name: input.full_name.unwrap_or_default().trim().to_string(),
                email: input.email.unwrap_or_default(),
                password_hash,
                status: input
                    .status
                    .as_deref()
                    .and_then(UserStatus::parse)
                    .unwrap_or_default(),
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(store_err)?;
        info!(user_id = %user.id, email = %user.email, "user created");
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, mut input: UserRequest) -> Result<User, Error> {
        normalize_email(&mut input);
        let violations = validate_fields(&input);
        if !violations.is_empty() {
            warn!(user_id = %id, ?violations, "update rejected");
            return Err(Error::Validation(violations));
        }

        let mut user = match self.store.get(id).await.map_err(store_err)? {
            Some(user) => user,
            None => return Err(Error::NotFound("user")),
        };

        user.full_name = input.full_name.unwrap_or_default().trim().to_string();
        user.email = input.email.unwrap_or_default();
        if let Some(status) = input.status.as_deref().and_then(UserStatus::parse) {
            user.status = status;
        }
        match input.password.as_deref() {
            Some(p) if p.len() >= MIN_PASSWORD_LEN => {
                user.password_hash = hash_password(p)?;
            }
            Some(_) => {
                // Too short on update keeps the current hash; only create rejects it.
                warn!(user_id = %id, "supplied password below minimum length, keeping current hash");
            }
            None => {}
        }
        user.updated_at = OffsetDateTime::now_utc();

        let user = self.store.update(user).await.map_err(store_err)?;
        info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        self.store.delete(id).await.map_err(store_err)?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Renders the report over one read snapshot of the record set.
    /// Mutations committed after the snapshot are not reflected.
    pub async fn generate_report(&self) -> Result<Vec<u8>, Error> {
        let snapshot = self.store.list().await.map_err(store_err)?;
        let mut params = BTreeMap::new();
        params.insert(
            REPORT_PARAM_CREATED_BY.to_string(),
            self.report_created_by.clone(),
        );
        let bytes = report::render(&snapshot, &params).map_err(|e| match e {
            RenderError::Template(t) => Error::TemplateCompile(t),
            other => Error::Render(other),
        })?;
        info!(records = snapshot.len(), bytes = bytes.len(), "report rendered");
        Ok(bytes)
    }
}
