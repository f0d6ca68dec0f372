//! In-memory credential store
//!
//! The session holds the API endpoint and key plus the flags tracking the
//! current upload attempt. It lives only as long as the running shell and is
//! never written to disk. The caller owns it and passes it to every operation.

use std::fmt;

use crate::error::ValidationError;

/// Credentials and progress flags for one interactive run
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    endpoint: String,
    api_key: String,
    authenticated: bool,
    upload_complete: bool,
    processing_complete: bool,
}

impl Session {
    /// Create an unauthenticated session
    pub fn new() -> Self {
        Self::default()
    }

    /// Store credentials and mark the session authenticated.
    ///
    /// No network call is made; a bad key only surfaces on the first API call.
    pub fn authenticate(&mut self, endpoint: &str, api_key: &str) -> Result<(), ValidationError> {
        if endpoint.is_empty() || api_key.is_empty() {
            return Err(ValidationError::MissingCredentials);
        }

        self.endpoint = endpoint.to_string();
        self.api_key = api_key.to_string();
        self.authenticated = true;
        tracing::info!("Authenticated against {}", self.endpoint);
        Ok(())
    }

    /// Reset every field to its default
    pub fn logout(&mut self) {
        *self = Self::default();
        tracing::info!("Logged out");
    }

    /// Drop authentication after the API rejected the key.
    ///
    /// Endpoint and key are kept so the status display can show what was
    /// rejected; a new `authenticate` overwrites them.
    pub fn revoke(&mut self) {
        self.authenticated = false;
        self.upload_complete = false;
        self.processing_complete = false;
        tracing::warn!("API key rejected, session de-authenticated");
    }

    /// Clear the per-attempt flags when a new file is selected
    pub fn begin_attempt(&mut self) {
        self.upload_complete = false;
        self.processing_complete = false;
    }

    pub fn mark_uploaded(&mut self) {
        if self.authenticated {
            self.upload_complete = true;
        }
    }

    pub fn mark_processed(&mut self) {
        if self.authenticated {
            self.processing_complete = true;
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn upload_complete(&self) -> bool {
        self.upload_complete
    }

    pub fn processing_complete(&self) -> bool {
        self.processing_complete
    }

    /// API key with all but the last four characters hidden
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.masked_key())
            .field("authenticated", &self.authenticated)
            .field("upload_complete", &self.upload_complete)
            .field("processing_complete", &self.processing_complete)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticated() -> Session {
        let mut session = Session::new();
        session.authenticate("https://api.example/gen", "k1").unwrap();
        session
    }

    #[test]
    fn test_authenticate_requires_both_fields() {
        let cases = [
            ("", "", false),
            ("https://api.example/gen", "", false),
            ("", "k1", false),
            ("https://api.example/gen", "k1", true),
        ];

        for (endpoint, key, ok) in cases {
            let mut session = Session::new();
            let result = session.authenticate(endpoint, key);
            assert_eq!(result.is_ok(), ok, "endpoint={:?} key={:?}", endpoint, key);
            assert_eq!(session.is_authenticated(), ok);
        }
    }

    #[test]
    fn test_authenticate_failure_leaves_session_untouched() {
        let mut session = Session::new();
        let err = session.authenticate("https://api.example/gen", "").unwrap_err();
        assert_eq!(err, ValidationError::MissingCredentials);
        assert_eq!(session, Session::default());
    }

    #[test]
    fn test_authenticate_stores_credentials() {
        let session = authenticated();
        assert_eq!(session.endpoint(), "https://api.example/gen");
        assert_eq!(session.api_key(), "k1");
        assert!(!session.upload_complete());
        assert!(!session.processing_complete());
    }

    #[test]
    fn test_logout_restores_default() {
        let mut session = authenticated();
        session.mark_uploaded();
        session.mark_processed();
        session.logout();
        assert_eq!(session, Session::default());

        let mut fresh = Session::new();
        fresh.logout();
        assert_eq!(fresh, Session::default());
    }

    #[test]
    fn test_revoke_clears_progress_flags() {
        let mut session = authenticated();
        session.mark_uploaded();
        session.revoke();
        assert!(!session.is_authenticated());
        assert!(!session.upload_complete());
        assert!(!session.processing_complete());
    }

    #[test]
    fn test_progress_flags_require_authentication() {
        let mut session = Session::new();
        session.mark_uploaded();
        session.mark_processed();
        assert!(!session.upload_complete());
        assert!(!session.processing_complete());
    }

    #[test]
    fn test_begin_attempt_clears_flags() {
        let mut session = authenticated();
        session.mark_uploaded();
        session.mark_processed();
        session.begin_attempt();
        assert!(session.is_authenticated());
        assert!(!session.upload_complete());
        assert!(!session.processing_complete());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let mut session = Session::new();
        session.authenticate("https://api.example/gen", "secret-key-1234").unwrap();
        let debug = format!("{:?}", session);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("1234"));
        assert_eq!(session.masked_key(), "***********1234");
    }

    #[test]
    fn test_masked_short_key() {
        let session = authenticated();
        assert_eq!(session.masked_key(), "**");
    }
}
