use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::billing::domain::UserId;
use crate::values::{DomainError, Email, EmailPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    email: Email,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
}

impl User {
    pub fn register(
        email: &str,
        first_name: &str,
        last_name: &str,
        policy: &EmailPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id: UserId::generate(),
            email: Email::parse(email, policy)?,
            first_name: required_name("first_name", first_name)?,
            last_name: required_name("last_name", last_name)?,
            created_at: now,
        })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn change_email(&mut self, email: &str, policy: &EmailPolicy) -> Result<(), DomainError> {
        self.email = Email::parse(email, policy)?;
        Ok(())
    }
}

fn required_name(field: &'static str, raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            email: user.email().value().to_string(),
            first_name: user.first_name().to_string(),
            last_name: user.last_name().to_string(),
            full_name: user.full_name(),
            created_at: user.created_at(),
        }
    }
}
