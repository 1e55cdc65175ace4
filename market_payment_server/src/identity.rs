//! Acting-identity extraction.
//!
//! Authentication itself is out of scope for this service: a trusted upstream (reverse proxy or
//! identity service) authenticates the caller and injects the `X-User-Id` and `X-User-Role`
//! headers. This module only reads those headers and enforces role requirements per route.

use std::{
    future::{ready, Ready},
    str::FromStr,
};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use market_payment_engine::db_types::UserId;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Buys listings.
    Client,
    /// Offers listings and fulfils orders.
    Provider,
    Admin,
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "provider" => Ok(Role::Provider),
            "admin" => Ok(Role::Admin),
            other => Err(AuthError::UnknownRole(other.to_string())),
        }
    }
}

//--------------------------------------     ActingUser      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct ActingUser {
    pub user_id: UserId,
    pub role: Role,
}

impl ActingUser {
    /// Checks that the acting user holds the given role. Admins pass every check.
    pub fn require(&self, role: Role) -> Result<(), ServerError> {
        if self.role == role || self.role == Role::Admin {
            Ok(())
        } else {
            Err(ServerError::AuthenticationError(AuthError::InsufficientPermissions(format!(
                "This action requires the {role:?} role"
            ))))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl FromRequest for ActingUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_identity(req))
    }
}

fn extract_identity(req: &HttpRequest) -> Result<ActingUser, ServerError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::MissingIdentity)?;
    let role = req
        .headers()
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingIdentity)?
        .parse::<Role>()?;
    Ok(ActingUser { user_id: user_id.into(), role })
}
