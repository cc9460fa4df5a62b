//! Authentication and authorization.
//!
//! User identity arrives via a trusted proxy header set by an upstream SSO
//! proxy; there is no native login surface. Authorization is a simple admin
//! flag on the user row.
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for getting the authenticated user in handlers

pub mod current_user;

use crate::api::models::users::CurrentUser;
use crate::errors::{Error, Result};

/// Reject non-admin callers of admin-only operations
pub fn require_admin(user: &CurrentUser, action: &str, resource: &str) -> Result<()> {
    if user.is_admin {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            action: action.to_string(),
            resource: resource.to_string(),
        })
    }
}
