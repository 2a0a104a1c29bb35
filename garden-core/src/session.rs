//! Authentication collaborator.
//!
//! Session management itself lives outside the sync layer; repositories only
//! need to know which user, if any, is signed in. The user id doubles as the
//! owner-scoping key on every remote query.

use std::sync::RwLock;

/// Supplies the currently signed-in user.
pub trait Session: Send + Sync {
    /// The active user id, or `None` when nobody is signed in.
    fn user_id(&self) -> Option<String>;
}

/// A session whose user is set explicitly.
#[derive(Debug, Default)]
pub struct StaticSession {
    user_id: RwLock<Option<String>>,
}

impl StaticSession {
    /// Creates a session already signed in as `user_id`.
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id.into())),
        }
    }

    /// Creates a session with nobody signed in.
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        if let Ok(mut guard) = self.user_id.write() {
            *guard = Some(user_id.into());
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.user_id.write() {
            *guard = None;
        }
    }
}

impl Session for StaticSession {
    fn user_id(&self) -> Option<String> {
        self.user_id
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_and_out() {
        let session = StaticSession::signed_out();
        assert!(session.user_id().is_none());

        session.sign_in("gardener-1");
        assert_eq!(session.user_id(), Some("gardener-1".to_string()));

        session.sign_out();
        assert!(session.user_id().is_none());
    }

    #[test]
    fn test_empty_user_id_is_not_signed_in() {
        let session = StaticSession::signed_in("");
        assert!(session.user_id().is_none());
    }
}
