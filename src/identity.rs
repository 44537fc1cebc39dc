//! Identity model returned by the resolve and login endpoints.
//!
//! The admin id lives inside [`Role::Admin`], so an identity with an admin id
//! and a non-admin role cannot be built. The wire payload is validated on the
//! way in.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Provider,
    Admin { admin_id: String },
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Provider => "provider",
            Self::Admin { .. } => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Resolved subject of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IdentityPayload", into = "IdentityPayload")]
pub struct Identity {
    pub display_name: String,
    pub email: Option<String>,
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub fn admin_id(&self) -> Option<&str> {
        match &self.role {
            Role::Admin { admin_id } => Some(admin_id),
            Role::User | Role::Provider => None,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleTag {
    #[serde(alias = "homeowner")]
    User,
    Provider,
    Admin,
}

/// Identity as the backend sends it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: RoleTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
}

impl IdentityPayload {
    /// Builds an admin identity from an admin endpoint response, whatever role
    /// tag the body carries.
    ///
    /// # Errors
    /// Returns [`IdentityError::MissingAdminId`] if the body has no usable admin id.
    pub fn into_admin(self) -> Result<Identity, IdentityError> {
        Self {
            role: RoleTag::Admin,
            ..self
        }
        .try_into()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("admin identity without adminId")]
    MissingAdminId,
    #[error("adminId present on a {0} identity")]
    UnexpectedAdminId(&'static str),
}

impl TryFrom<IdentityPayload> for Identity {
    type Error = IdentityError;

    fn try_from(payload: IdentityPayload) -> Result<Self, Self::Error> {
        let admin_id = payload
            .admin_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let role = match (payload.role, admin_id) {
            (RoleTag::Admin, Some(admin_id)) => Role::Admin { admin_id },
            (RoleTag::Admin, None) => return Err(IdentityError::MissingAdminId),
            (RoleTag::User, None) => Role::User,
            (RoleTag::Provider, None) => Role::Provider,
            (RoleTag::User, Some(_)) => return Err(IdentityError::UnexpectedAdminId("user")),
            (RoleTag::Provider, Some(_)) => {
                return Err(IdentityError::UnexpectedAdminId("provider"));
            }
        };

        Ok(Self {
            display_name: payload.name,
            email: payload.email,
            role,
        })
    }
}

impl From<Identity> for IdentityPayload {
    fn from(identity: Identity) -> Self {
        let (role, admin_id) = match identity.role {
            Role::User => (RoleTag::User, None),
            Role::Provider => (RoleTag::Provider, None),
            Role::Admin { admin_id } => (RoleTag::Admin, Some(admin_id)),
        };
        Self {
            name: identity.display_name,
            email: identity.email,
            role,
            admin_id,
        }
    }
}
