//! In-memory session state shared by the session managers

/// Signed-in user plus the "still restoring" flag
#[derive(Debug, Clone)]
pub struct SessionState<U> {
    pub user: Option<U>,
    pub loading: bool,
}

impl<U> SessionState<U> {
    /// State before the cache has been read
    pub fn loading() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl<U> Default for SessionState<U> {
    fn default() -> Self {
        Self::loading()
    }
}
