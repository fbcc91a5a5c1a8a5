//! Small helpers shared across the domain.

use serde::{Deserialize, Serialize};

/// A slot that can be filled exactly once.
///
/// Setting the same value again is accepted (replicas re-enter phases after a
/// restart and recompute identical values); setting a different value is
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteOnce<T>(Option<T>);

impl<T> Default for WriteOnce<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T: PartialEq> WriteOnce<T> {
    pub fn new() -> Self {
        Self(None)
    }

    /// Fill the slot. Returns `false` if it already holds a different value.
    pub fn set(&mut self, value: T) -> bool {
        match &self.0 {
            Some(existing) => *existing == value,
            None => {
                self.0 = Some(value);
                true
            }
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}
