//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{is_valid_user_status, ROLE_USER, USER_STATUS_ACTIVE};
use crate::entity::{DomainEntity, MergeOutcome, Mergeable};
use crate::error::{DomainError, DomainResult};

/// User account.
///
/// `credential` is raw only between construction and the credential guard;
/// it is always persisted hashed and never serialized or logged.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub credential: String,
    #[serde(default = "default_roles")]
    pub roles: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub age: i32,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "Utc::now")]
    pub created_date: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_date: DateTime<Utc>,
}

fn default_roles() -> String {
    ROLE_USER.to_string()
}

fn default_status() -> String {
    USER_STATUS_ACTIVE.to_string()
}

// Don't expose the credential in debug output
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("credential", &"[REDACTED]")
            .field("roles", &self.roles)
            .field("email", &self.email)
            .field("status", &self.status)
            .field("created_date", &self.created_date)
            .field("updated_date", &self.updated_date)
            .finish_non_exhaustive()
    }
}

impl User {
    /// Create a new, not yet persisted user with default role and status.
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            username: username.into(),
            credential: credential.into(),
            roles: default_roles(),
            email: email.into(),
            phone: None,
            first_name: None,
            last_name: None,
            age: 0,
            city: None,
            status: default_status(),
            created_date: now,
            updated_date: now,
        }
    }

    /// Check if the account is active
    pub fn is_active(&self) -> bool {
        self.status == USER_STATUS_ACTIVE
    }
}

impl DomainEntity for User {
    const KIND: &'static str = "user";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn id_slot(&mut self) -> &mut Option<String> {
        &mut self.id
    }

    fn created_date(&self) -> DateTime<Utc> {
        self.created_date
    }

    fn updated_date(&self) -> DateTime<Utc> {
        self.updated_date
    }

    fn set_created_date(&mut self, at: DateTime<Utc>) {
        self.created_date = at;
    }

    fn set_updated_date(&mut self, at: DateTime<Utc>) {
        self.updated_date = at;
    }
}

impl Mergeable for User {
    type Patch = UpdateUser;

    fn validate(&self) -> DomainResult<()> {
        if self.username.trim().is_empty() {
            return Err(DomainError::validation("username required"));
        }
        if self.email.trim().is_empty() {
            return Err(DomainError::validation("email required"));
        }
        if !is_valid_user_status(&self.status) {
            return Err(DomainError::validation(format!(
                "Unknown user status: {}",
                self.status
            )));
        }
        Ok(())
    }

    fn merge(&mut self, patch: UpdateUser, now: DateTime<Utc>) -> DomainResult<MergeOutcome> {
        if let Some(status) = patch.status.as_deref() {
            if !is_valid_user_status(status) {
                return Err(DomainError::validation(format!(
                    "Unknown user status: {}",
                    status
                )));
            }
        }

        if patch
            .username
            .as_deref()
            .is_some_and(|username| username.trim().is_empty())
        {
            return Err(DomainError::validation("username required"));
        }

        let mut outcome = MergeOutcome::default();

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(credential) = patch.credential {
            self.credential = credential;
            outcome.credential_supplied = true;
        }
        if let Some(roles) = patch.roles {
            self.roles = roles;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = Some(phone);
        }
        if let Some(first_name) = patch.first_name {
            self.first_name = Some(first_name);
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = Some(last_name);
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(city) = patch.city {
            self.city = Some(city);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }

        self.touch(now);
        Ok(outcome)
    }

    fn credential_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.credential)
    }
}

/// User update data transfer object.
///
/// Only the fields listed here are mutable; identity and creation date are
/// not representable.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub name: Option<String>,
    pub username: Option<String>,
    /// New raw credential, hashed before persistence
    pub credential: Option<String>,
    pub roles: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub city: Option<String>,
    pub status: Option<String>,
}

impl std::fmt::Debug for UpdateUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateUser")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("credential", &self.credential.as_ref().map(|_| "[REDACTED]"))
            .field("roles", &self.roles)
            .field("email", &self.email)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
