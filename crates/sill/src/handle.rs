use std::{
    num::NonZeroU64,
    sync::atomic::{AtomicU64, Ordering},
};

/// An opaque, backend-defined identifier for a created native resource.
///
/// Zero is the universal invalid sentinel. Handles are only ever compared
/// against the sentinel; what the other bit patterns mean is the owning
/// backend's business.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeHandle(u64);

impl NativeHandle {
    pub const INVALID: Self = Self(0);

    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// The identity of a started platform session.
///
/// Windows and surfaces record the id of the platform that created them as a
/// non-owning back-reference. Operations that span two objects compare these
/// ids instead of dereferencing anything, which is what makes the check safe
/// even when the caller has violated the destroy-children-first obligation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlatformId(NonZeroU64);

impl PlatformId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);

        let id = NEXT.fetch_add(1, Ordering::Relaxed);

        // SAFETY: the counter starts at 1 and only ever increments.
        Self(unsafe { NonZeroU64::new_unchecked(id) })
    }
}
