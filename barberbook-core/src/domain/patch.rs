//! Per-field partial update marker

/// A single field of a partial update
///
/// Keeps "leave it alone" (`Unset`) apart from "remove the value" (`Clear`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unset,
    Set(T),
    Clear,
}

impl<T> Patch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// The value to store, if this patch touches the field
    ///
    /// `None` for `Unset`, `Some(None)` for `Clear`.
    pub fn into_change(self) -> Option<Option<T>> {
        match self {
            Self::Unset => None,
            Self::Set(v) => Some(Some(v)),
            Self::Clear => Some(None),
        }
    }
}
