use crate::identity::Identity;

/// Snapshot of the session as seen by readers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub loading: bool,
}

impl SessionState {
    /// State at process start, before the stored token is resolved.
    #[must_use]
    pub const fn starting() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(Identity::is_admin)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::starting()
    }
}
