//! Authenticated session for the remote document store
//!
//! The session is an explicit value with a visible lifecycle: created by
//! `DocStoreClient::login`, passed by reference to every remote call, and
//! ended with `invalidate`. Nothing here is global or implicitly shared.

use chrono::{DateTime, Utc};

use crate::errors::TransportError;

/// Bearer credential plus the identity it was issued for.
#[derive(Debug, Clone)]
pub struct Session {
    id_token: String,
    pub local_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(id_token: String, local_id: String, email: String) -> Self {
        Self {
            id_token,
            local_id,
            email,
            created_at: Utc::now(),
        }
    }

    /// The bearer token, or `NotAuthenticated` once invalidated.
    pub fn bearer_token(&self) -> Result<&str, TransportError> {
        if self.id_token.is_empty() {
            Err(TransportError::NotAuthenticated)
        } else {
            Ok(&self.id_token)
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.id_token.is_empty()
    }

    /// Drop the credential. Subsequent remote calls with this session fail
    /// with `NotAuthenticated`.
    pub fn invalidate(&mut self) {
        self.id_token.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut session = Session::new("tok".into(), "uid".into(), "ops@plant.example".into());
        assert!(session.is_valid());
        assert_eq!(session.bearer_token().unwrap(), "tok");

        session.invalidate();
        assert!(!session.is_valid());
        assert!(matches!(
            session.bearer_token(),
            Err(TransportError::NotAuthenticated)
        ));
    }
}
