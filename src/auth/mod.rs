//! Role model and access-control gate
//!
//! Session issuance lives in the external identity provider; this module
//! only verifies tokens (see [`jwt`]) and decides which actor may invoke
//! which operation. Roles are a closed set attached to the authenticated
//! actor, computed once per request.

pub mod jwt;

use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

/// The three actor roles in the origination workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Borrower,
    Admin,
    Rider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Borrower => "borrower",
            Role::Admin => "admin",
            Role::Rider => "rider",
        }
    }

    /// Parse a role name; unknown names are dropped by the caller rather
    /// than stored.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "borrower" => Some(Role::Borrower),
            "admin" => Some(Role::Admin),
            "rider" => Some(Role::Rider),
            _ => None,
        }
    }

    fn bit(&self) -> u8 {
        match self {
            Role::Borrower => 0b001,
            Role::Admin => 0b010,
            Role::Rider => 0b100,
        }
    }
}

/// A set of roles. Authorization is intersection-based: an operation
/// declaring several required roles accepts an actor holding any one of
/// them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);

    pub fn of(roles: &[Role]) -> Self {
        let mut set = RoleSet::EMPTY;
        for role in roles {
            set.insert(*role);
        }
        set
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn intersects(&self, other: RoleSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Build a set from role names, silently dropping unknown names
    pub fn from_names<'a, I: IntoIterator<Item = &'a str>>(names: I) -> Self {
        let mut set = RoleSet::EMPTY;
        for name in names {
            if let Some(role) = Role::parse(name) {
                set.insert(role);
            }
        }
        set
    }
}

/// The authenticated actor attached to a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub roles: RoleSet,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(Role::Admin)
    }
}

/// Gate an operation on the actor's identity and role set.
///
/// `None` means no valid identity reached this point (Unauthenticated);
/// an actor whose roles do not intersect `required` is Forbidden. The two
/// are deliberately distinct error categories.
pub fn authorize<'a>(
    actor: Option<&'a AuthContext>,
    required: RoleSet,
) -> Result<&'a AuthContext, ApiError> {
    let actor =
        actor.ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    if !actor.roles.intersects(required) {
        return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
    }

    Ok(actor)
}

/// Shorthand used by the service layer once the extractor has produced a
/// context.
pub fn require_role(actor: &AuthContext, required: RoleSet) -> Result<(), ApiError> {
    authorize(Some(actor), required).map(|_| ())
}
