//! Backend-agnostic windowing and off-screen surfaces.
//!
//! ## Goals
//!
//! - Feature set
//!  - Opening OS windows and polling their input/system events without
//!    depending on which native windowing library does the work.
//!  - Off-screen pixel surfaces over caller-owned buffers, blittable onto any
//!    window created by the same platform.
//!  - A null backend with the exact observable behavior of the native one, so
//!    lifecycle logic can be tested without a display.
//!
//! ## Non-goals
//!
//!  - Rendering pipelines or GPU resource management.
//!  - Input-device abstraction beyond event-type tagging.
//!  - Multi-window compositing policy.
//!
//! ## Lifecycle contract
//!
//! A [`Platform`] owns a backend session. Windows and surfaces created through
//! it hold a non-owning reference back to it, and must be destroyed through it
//! *before* the platform is shut down or dropped. The library does not chase
//! children down on shutdown; a window or surface that outlives its platform
//! holds a dead handle, and using it is a caller bug.

pub mod backend;
pub mod event;

mod handle;
mod platform;

pub use handle::{NativeHandle, PlatformId};
pub use platform::{
    BackendKind, BlitDesc, Error, Platform, PlatformDesc, Surface, SurfaceDesc, Window, WindowDesc,
    WindowFeatures,
};
