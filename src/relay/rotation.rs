//! Round-robin backend rotation.

use std::sync::{Arc, Mutex};

use crate::backend::Backend;

/// Round-robin selector.
///
/// Keeps a cursor into the backend list. Reading the slot and advancing
/// the cursor happen under one lock, so concurrent selections never pick
/// the same slot twice before the cursor moves on. Each switcher owns its
/// own selector; two switchers over the same backends rotate
/// independently.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: Mutex<usize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the backend at the cursor and advance it by one slot,
    /// wrapping at the end of the list.
    pub fn next_backend(&self, backends: &[Arc<dyn Backend>]) -> Option<Arc<dyn Backend>> {
        if backends.is_empty() {
            return None;
        }

        let mut cursor = self.cursor.lock().expect("rotation cursor poisoned");
        let index = *cursor % backends.len();
        *cursor = (index + 1) % backends.len();
        Some(Arc::clone(&backends[index]))
    }
}
