//! Profile rows: display name and avatar stored apart from the auth record.

use serde::{Deserialize, Serialize};

use crate::backend::{AuthBackend, BackendError};

pub const PROFILES_TABLE: &str = "profiles";
const ID_COLUMN: &str = "id";

/// Mirrors the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Columns that may change on an existing profile. Unset fields are left
/// out of the patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfilePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar_url.is_none()
    }
}

/// Display name derived from an email: everything before the first `@`.
#[must_use]
pub fn name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_owned()
}

pub async fn fetch_profile(backend: &dyn AuthBackend, id: &str) -> Result<Option<ProfileRow>, BackendError> {
    let Some(row) = backend.select_single(PROFILES_TABLE, ID_COLUMN, id).await? else {
        return Ok(None);
    };
    serde_json::from_value(row)
        .map(Some)
        .map_err(|e| BackendError::Parse(e.to_string()))
}

pub async fn insert_profile(backend: &dyn AuthBackend, row: &ProfileRow) -> Result<(), BackendError> {
    let value = serde_json::to_value(row).map_err(|e| BackendError::Parse(e.to_string()))?;
    backend.insert(PROFILES_TABLE, value).await?;
    Ok(())
}

/// Patch an existing profile row. A patch that touches no row is an error,
/// since the backend answers it with an empty success.
pub async fn update_profile(backend: &dyn AuthBackend, id: &str, patch: &ProfilePatch) -> Result<(), BackendError> {
    let value = serde_json::to_value(patch).map_err(|e| BackendError::Parse(e.to_string()))?;
    let rows = backend.update(PROFILES_TABLE, ID_COLUMN, id, value).await?;
    if rows.is_empty() {
        return Err(BackendError::NoRowsMatched { table: PROFILES_TABLE.to_owned() });
    }
    Ok(())
}

pub async fn delete_profile(backend: &dyn AuthBackend, id: &str) -> Result<(), BackendError> {
    backend.delete(PROFILES_TABLE, ID_COLUMN, id).await
}

/// Row for a freshly registered user. The avatar starts empty.
#[must_use]
pub fn new_profile_row(id: &str, name: &str, email: &str) -> ProfileRow {
    ProfileRow { id: id.to_owned(), name: Some(name.to_owned()), email: Some(email.to_owned()), avatar_url: None }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
