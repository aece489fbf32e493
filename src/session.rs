// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Current-user context consumed by the views.
//!
//! Authentication itself happens in the backend. The client only learns
//! whether someone is signed in, and that answer gates every user-scoped
//! query.

use crate::models::User;
use crate::query::{FetchError, Fetcher, QueryKey};

/// Endpoint that reports the signed-in user.
pub const CURRENT_USER_PATH: &str = "/api/auth/user";

/// Who is signed in, if anyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    user: Option<User>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    /// Ask the backend for the current user.
    ///
    /// A `401` means nobody is signed in, which is a valid state rather than
    /// an error.
    pub async fn load(fetcher: &dyn Fetcher) -> Result<Self, FetchError> {
        match fetcher.fetch(&QueryKey::new(CURRENT_USER_PATH)).await {
            Ok(value) => {
                let user: Option<User> =
                    serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))?;
                Ok(Self { user })
            }
            Err(FetchError::Unauthorized) => {
                tracing::debug!("No active session");
                Ok(Self::anonymous())
            }
            Err(e) => Err(e),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Gate for user-scoped queries.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
