//! Destination user accounts referenced by archived aggregates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// User account with the descriptive attributes that travel in member snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub name: Option<String>,
    pub title_before: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub title_after: Option<String>,
}

impl User {
    /// Creates a user with a generated id and no descriptive attributes.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: None,
            phone: None,
            mobile: None,
            name: None,
            title_before: None,
            first_name: None,
            middle_name: None,
            last_name: None,
            title_after: None,
        }
    }
}
