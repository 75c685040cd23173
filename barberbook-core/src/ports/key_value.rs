//! Local persistent key-value storage port

use crate::domain::result::Result;

/// String key-value storage that survives restarts
///
/// Implementations must make each call atomic on its own; there is no
/// multi-key transaction.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error
    fn remove_item(&self, key: &str) -> Result<()>;
}
