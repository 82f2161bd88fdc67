//! Hardware write mode with scoped override.
//!
//! The mode decides whether actuator writes reach the hardware or are only
//! logged. It lives in a [`WriteModeCell`] that is handed explicitly to
//! every hardware-write boundary. [`WriteModeCell::override_with`] swaps the
//! mode for the lifetime of the returned guard; dropping the guard restores
//! the previous mode on every exit path, including `?` returns and panics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Whether hardware writes are applied or simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum WriteMode {
    /// Writes go to the device.
    #[default]
    Apply,
    /// Writes are logged and dropped.
    Simulate,
}

impl WriteMode {
    fn to_raw(self) -> u8 {
        match self {
            Self::Apply => 0,
            Self::Simulate => 1,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Apply,
            _ => Self::Simulate,
        }
    }

    pub fn is_simulated(self) -> bool {
        self == Self::Simulate
    }
}

/// Shared, cloneable holder for the current [`WriteMode`].
#[derive(Debug, Clone)]
pub struct WriteModeCell {
    mode: Arc<AtomicU8>,
}

impl Default for WriteModeCell {
    fn default() -> Self {
        Self::new(WriteMode::default())
    }
}

impl WriteModeCell {
    pub fn new(mode: WriteMode) -> Self {
        Self {
            mode: Arc::new(AtomicU8::new(mode.to_raw())),
        }
    }

    pub fn get(&self) -> WriteMode {
        WriteMode::from_raw(self.mode.load(Ordering::SeqCst))
    }

    pub fn set(&self, mode: WriteMode) {
        self.mode.store(mode.to_raw(), Ordering::SeqCst);
    }

    /// Switch to `mode` until the returned guard is dropped.
    #[must_use = "the previous mode is restored as soon as the guard is dropped"]
    pub fn override_with(&self, mode: WriteMode) -> WriteModeGuard {
        let previous = WriteMode::from_raw(self.mode.swap(mode.to_raw(), Ordering::SeqCst));
        tracing::debug!(?previous, current = ?mode, "write mode overridden");
        WriteModeGuard {
            cell: self.clone(),
            previous,
        }
    }
}

/// Restores the previous write mode on drop.
#[derive(Debug)]
pub struct WriteModeGuard {
    cell: WriteModeCell,
    previous: WriteMode,
}

impl WriteModeGuard {
    pub fn previous(&self) -> WriteMode {
        self.previous
    }
}

impl Drop for WriteModeGuard {
    fn drop(&mut self) {
        self.cell.set(self.previous);
    }
}
