//! Backend capability table and its implementations.
//!
//! A backend binds every operation of the [`Backend`] trait; there is no
//! partial binding and no fallback. The [`null`] backend satisfies the
//! contract without touching any OS resource, and is the one the tests run
//! against. The [`win32`] backend forwards to the Win32 API.

mod null;
#[cfg(windows)]
mod win32;

pub use null::NullBackend;
#[cfg(windows)]
pub use win32::Win32Backend;

use crate::{
    event::Event,
    handle::NativeHandle,
    platform::{BlitDesc, SurfaceDesc, WindowDesc},
};

/// The result of a surface creation call: the new handle plus the pitch
/// (bytes per row) the backend decided on.
///
/// The pitch may exceed `width * 4` due to backend alignment rules; callers
/// must use the reported value and never recompute it.
#[derive(Clone, Copy, Debug)]
pub struct CreatedSurface {
    pub handle: NativeHandle,
    pub pitch: u32,
}

impl CreatedSurface {
    pub const INVALID: Self = Self {
        handle: NativeHandle::INVALID,
        pitch: 0,
    };
}

/// The capability table every backend binds in full.
///
/// All handles are opaque and backend-defined, with zero as the invalid
/// sentinel. Creation calls report failure by returning the sentinel; nothing
/// here panics on a runtime failure.
pub trait Backend {
    /// Starts the backend session. Returns the invalid sentinel if the
    /// session could not be started, in which case no other operation may be
    /// invoked.
    fn create_backend(&mut self, overrides: Option<&NativeOverride>) -> NativeHandle;

    fn destroy_backend(&mut self, backend: NativeHandle);

    /// Drains at most one native event and maps it into an [`Event`].
    ///
    /// Never blocks waiting for input. A native event with no mapping is
    /// reported as [`Event::Undefined`], not swallowed.
    fn poll_event(&mut self, backend: NativeHandle) -> Option<Event>;

    fn create_window(&mut self, desc: &WindowDesc, backend: NativeHandle) -> NativeHandle;

    fn destroy_window(&mut self, window: NativeHandle);

    fn create_surface(&mut self, desc: &SurfaceDesc, backend: NativeHandle) -> CreatedSurface;

    fn destroy_surface(&mut self, surface: NativeHandle);

    /// Copies a rectangle of the surface's pixels onto the window.
    ///
    /// Rectangles arrive verbatim; out-of-bounds geometry is the backend's to
    /// reject. Cross-platform pairings never reach this call.
    fn blit_surface(&mut self, surface: NativeHandle, desc: &BlitDesc, window: NativeHandle)
        -> bool;
}

/// Backend-only platform configuration.
///
/// Each backend understands exactly one variant and silently ignores the
/// others, so a descriptor carrying the wrong variant degrades to the
/// defaults rather than failing.
#[derive(Clone, Debug)]
pub enum NativeOverride {
    Null(NullOverride),
    Win32(Win32Override),
}

#[derive(Clone, Debug, Default)]
pub struct NullOverride {
    /// Trace every capability call at debug level. Useful when a test
    /// sequence is misbehaving and the call counts alone don't explain it.
    pub log_actions: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Win32Override {
    /// Replaces the window class name registered at startup.
    pub class_name: Option<String>,
}

/// Backend-only window configuration, attached to a window descriptor.
#[derive(Clone, Copy, Debug)]
pub enum WindowOverride {
    Win32(Win32WindowOverride),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Win32WindowOverride {
    /// Extra `WS_EX_*` bits OR'd into the extended style of the created
    /// window.
    pub ex_style: u32,
}
