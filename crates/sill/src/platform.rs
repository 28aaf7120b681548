use geometry::{Extent, Rect, ScreenPx, SurfacePx};

use crate::{
    backend::{Backend, NativeOverride, NullBackend, WindowOverride},
    event::Event,
    handle::{NativeHandle, PlatformId},
};

/// Failures surfaced by platform operations.
///
/// These are runtime conditions a caller is expected to handle, as opposed to
/// contract violations, which fail fast in debug builds.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("the backend failed to start")]
    BackendStart,

    #[error("the platform is not started")]
    NotStarted,

    #[error("window and surface dimensions must be positive")]
    InvalidExtent,

    #[error("the backend failed to create the window")]
    WindowCreation,

    #[error("the backend failed to create the surface")]
    SurfaceCreation,
}

bitflags::bitflags! {
    /// Abstract window presentation properties.
    ///
    /// Backends translate each bit into the corresponding native flag by an
    /// explicit one-to-one mapping; no bit implies any other.
    pub struct WindowFeatures: u32 {
        const FULLSCREEN = 0x1;
        const BORDERLESS = 0x2;
        const RESIZABLE = 0x4;
        const MINIMIZED = 0x8;
        const MAXIMIZED = 0x10;
    }
}

impl Default for WindowFeatures {
    fn default() -> Self {
        WindowFeatures::empty()
    }
}

/// Selects the backend a platform binds at start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// No-op backend for headless execution and tests.
    Null,
    #[cfg(windows)]
    Win32,
}

/// A description of a platform to be started.
pub struct PlatformDesc {
    pub backend: BackendKind,
    pub native_override: Option<NativeOverride>,
}

impl Default for PlatformDesc {
    fn default() -> Self {
        Self {
            backend: BackendKind::Null,
            native_override: None,
        }
    }
}

/// A description of a window to be created.
pub struct WindowDesc<'a> {
    pub title: &'a str,
    pub extent: Extent<i32, ScreenPx>,
    pub features: WindowFeatures,
    pub native_override: Option<WindowOverride>,
}

/// A description of an off-screen surface over a caller-owned pixel buffer.
///
/// Pixels are 32-bit BGRA. The buffer must hold at least `height` rows of the
/// pitch the backend reports at creation; backends reject descriptors whose
/// buffer is too small for their own pitch.
pub struct SurfaceDesc<'a> {
    pub extent: Extent<i32, SurfacePx>,
    pub pixels: &'a [u8],
}

/// Source and destination rectangles for a blit, in surface and window pixel
/// space respectively.
///
/// Rectangles are forwarded to the backend verbatim; nothing here clips or
/// clamps them.
#[derive(Clone, Copy)]
pub struct BlitDesc {
    pub source: Rect<i32, SurfacePx>,
    pub destination: Rect<i32, ScreenPx>,
}

/// An on-screen window resource.
///
/// Created through [`Platform::create_window`] and destroyed through
/// [`Platform::destroy_window`], which must happen before the parent platform
/// shuts down.
#[must_use]
pub struct Window {
    handle: NativeHandle,
    parent: Option<PlatformId>,
}

impl Window {
    /// The backend's handle for this window. Events carry this value to
    /// identify the window they concern.
    #[must_use]
    pub fn native_handle(&self) -> NativeHandle {
        self.handle
    }

    /// True until the window is destroyed.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.handle.is_valid()
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if self.handle.is_valid() {
            log::warn!("window dropped while still live; its native resources leak");
        }
    }
}

/// An off-screen pixel surface resource.
///
/// The pixel buffer belongs to the caller for the surface's entire lifetime;
/// the surface only remembers where it is.
#[must_use]
pub struct Surface {
    handle: NativeHandle,
    parent: Option<PlatformId>,
    extent: Extent<i32, SurfacePx>,
    pitch: u32,
    pixels: *const u8,
    len: usize,
}

impl Surface {
    #[must_use]
    pub fn native_handle(&self) -> NativeHandle {
        self.handle
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.handle.is_valid()
    }

    #[must_use]
    pub fn extent(&self) -> Extent<i32, SurfacePx> {
        self.extent
    }

    /// Bytes per row as computed by the backend at creation. May exceed
    /// `width * 4`; always address the buffer with this, never with a
    /// recomputed value.
    #[must_use]
    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    /// Location of the caller-owned pixel buffer this surface was created
    /// over. The surface holds no claim on it beyond reading during blits.
    #[must_use]
    pub fn pixels(&self) -> *const u8 {
        self.pixels
    }

    /// Length in bytes of the caller-owned pixel buffer.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.len
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        if self.handle.is_valid() {
            log::warn!("surface dropped while still live; its native resources leak");
        }
    }
}

/// Owns one backend binding and the session it started.
///
/// Exactly one live platform drives a given backend session. Dropping the
/// platform shuts the session down; windows and surfaces must already be gone
/// by then (see the crate-level lifecycle contract).
pub struct Platform {
    backend: Box<dyn Backend>,
    handle: NativeHandle,
    id: PlatformId,
}

impl Platform {
    /// Binds the described backend and starts a session on it.
    pub fn start(desc: &PlatformDesc) -> Result<Self, Error> {
        let backend: Box<dyn Backend> = match desc.backend {
            BackendKind::Null => Box::new(NullBackend::new()),
            #[cfg(windows)]
            BackendKind::Win32 => Box::new(crate::backend::Win32Backend::new()),
        };

        Self::with_backend(backend, desc.native_override.as_ref())
    }

    /// Starts a session on a caller-supplied backend binding.
    pub fn with_backend(
        mut backend: Box<dyn Backend>,
        overrides: Option<&NativeOverride>,
    ) -> Result<Self, Error> {
        let handle = backend.create_backend(overrides);
        if !handle.is_valid() {
            return Err(Error::BackendStart);
        }

        Ok(Self {
            backend,
            handle,
            id: PlatformId::next(),
        })
    }

    /// True from start until the first `shutdown` call.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.handle.is_valid()
    }

    /// The backend's handle for the session itself.
    #[must_use]
    pub fn native_handle(&self) -> NativeHandle {
        self.handle
    }

    /// The identity windows and surfaces record as their parent.
    #[must_use]
    pub fn id(&self) -> PlatformId {
        self.id
    }

    /// Ends the backend session. Idempotent: calling this on an
    /// already-shut-down platform is a no-op.
    pub fn shutdown(&mut self) {
        if self.handle.is_valid() {
            self.backend.destroy_backend(self.handle);
            self.handle = NativeHandle::INVALID;
        }
    }

    /// Drains one pending event, or returns `None` when the native queue is
    /// empty.
    ///
    /// Never blocks. Call in a loop until `None` to fully drain the queue
    /// within one tick; nothing is batched or dropped on the library's side.
    pub fn poll_event(&mut self) -> Option<Event> {
        debug_assert!(
            self.handle.is_valid(),
            "poll_event on a platform that is not started"
        );
        self.backend.poll_event(self.handle)
    }

    /// Creates a window.
    ///
    /// Fails without reaching the backend if the platform has been shut down
    /// or the descriptor's extent is not positive; fails with
    /// [`Error::WindowCreation`] if the backend could not produce a window.
    pub fn create_window(&mut self, desc: &WindowDesc) -> Result<Window, Error> {
        if !self.handle.is_valid() {
            return Err(Error::NotStarted);
        }
        if desc.extent.width <= 0 || desc.extent.height <= 0 {
            return Err(Error::InvalidExtent);
        }

        let handle = self.backend.create_window(desc, self.handle);
        if !handle.is_valid() {
            return Err(Error::WindowCreation);
        }

        Ok(Window {
            handle,
            parent: Some(self.id),
        })
    }

    /// Destroys a window created by this platform and clears it back to the
    /// finished state. Destroying an already-finished window is a no-op.
    pub fn destroy_window(&mut self, window: &mut Window) {
        if !window.handle.is_valid() {
            return;
        }
        debug_assert_eq!(
            window.parent,
            Some(self.id),
            "window destroyed through a platform that did not create it"
        );

        self.backend.destroy_window(window.handle);
        window.handle = NativeHandle::INVALID;
        window.parent = None;
    }

    /// Creates an off-screen surface over the descriptor's pixel buffer.
    ///
    /// The width, height, and buffer location are cached on the returned
    /// surface along with the backend-reported pitch.
    ///
    /// ## Safety
    ///
    /// `desc.pixels` must remain valid, and at the same address, for the
    /// entire lifetime of the returned surface. The surface never copies or
    /// frees the buffer; backends read from it on every blit.
    pub unsafe fn create_surface(&mut self, desc: &SurfaceDesc) -> Result<Surface, Error> {
        if !self.handle.is_valid() {
            return Err(Error::NotStarted);
        }
        if desc.extent.width <= 0 || desc.extent.height <= 0 {
            return Err(Error::InvalidExtent);
        }

        let created = self.backend.create_surface(desc, self.handle);
        if !created.handle.is_valid() {
            return Err(Error::SurfaceCreation);
        }

        Ok(Surface {
            handle: created.handle,
            parent: Some(self.id),
            extent: desc.extent,
            pitch: created.pitch,
            pixels: desc.pixels.as_ptr(),
            len: desc.pixels.len(),
        })
    }

    /// Destroys a surface created by this platform. The caller's pixel buffer
    /// is untouched. Destroying an already-finished surface is a no-op.
    pub fn destroy_surface(&mut self, surface: &mut Surface) {
        if !surface.handle.is_valid() {
            return;
        }
        debug_assert_eq!(
            surface.parent,
            Some(self.id),
            "surface destroyed through a platform that did not create it"
        );

        self.backend.destroy_surface(surface.handle);
        surface.handle = NativeHandle::INVALID;
        surface.parent = None;
    }

    /// Copies a rectangle of the surface onto the window.
    ///
    /// Returns false, without any backend call, unless the surface and the
    /// window were both created by this platform and both are still live.
    /// Blitting across two platform sessions is undefined at the native
    /// level, so it is rejected here. Rectangle geometry is not validated;
    /// out-of-bounds rectangles are the backend's to reject.
    pub fn blit_surface(&mut self, surface: &Surface, desc: &BlitDesc, window: &Window) -> bool {
        if surface.parent != Some(self.id) || window.parent != Some(self.id) {
            return false;
        }
        if !surface.handle.is_valid() || !window.handle.is_valid() || !self.handle.is_valid() {
            return false;
        }

        self.backend
            .blit_surface(surface.handle, desc, window.handle)
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use geometry::Point;

    use super::*;
    use crate::backend::CreatedSurface;

    #[derive(Default)]
    struct Counts {
        create_backend: u32,
        destroy_backend: u32,
        poll_event: u32,
        create_window: u32,
        destroy_window: u32,
        create_surface: u32,
        destroy_surface: u32,
        blit_surface: u32,
    }

    /// Records every capability call so tests can assert exact call counts.
    struct Recorder {
        counts: Rc<RefCell<Counts>>,
        fail_start: bool,
        pitch: u32,
        next_handle: u64,
    }

    impl Recorder {
        fn new() -> (Self, Rc<RefCell<Counts>>) {
            let counts = Rc::new(RefCell::new(Counts::default()));
            (
                Self {
                    counts: counts.clone(),
                    fail_start: false,
                    pitch: 0,
                    next_handle: 1,
                },
                counts,
            )
        }

        fn mint(&mut self) -> NativeHandle {
            let handle = NativeHandle::from_raw(self.next_handle);
            self.next_handle += 1;
            handle
        }
    }

    impl Backend for Recorder {
        fn create_backend(&mut self, _overrides: Option<&NativeOverride>) -> NativeHandle {
            self.counts.borrow_mut().create_backend += 1;
            if self.fail_start {
                NativeHandle::INVALID
            } else {
                self.mint()
            }
        }

        fn destroy_backend(&mut self, _backend: NativeHandle) {
            self.counts.borrow_mut().destroy_backend += 1;
        }

        fn poll_event(&mut self, _backend: NativeHandle) -> Option<Event> {
            self.counts.borrow_mut().poll_event += 1;
            None
        }

        fn create_window(&mut self, _desc: &WindowDesc, _backend: NativeHandle) -> NativeHandle {
            self.counts.borrow_mut().create_window += 1;
            self.mint()
        }

        fn destroy_window(&mut self, _window: NativeHandle) {
            self.counts.borrow_mut().destroy_window += 1;
        }

        fn create_surface(
            &mut self,
            desc: &SurfaceDesc,
            _backend: NativeHandle,
        ) -> CreatedSurface {
            self.counts.borrow_mut().create_surface += 1;
            let pitch = if self.pitch != 0 {
                self.pitch
            } else {
                desc.extent.width as u32 * 4
            };
            CreatedSurface {
                handle: self.mint(),
                pitch,
            }
        }

        fn destroy_surface(&mut self, _surface: NativeHandle) {
            self.counts.borrow_mut().destroy_surface += 1;
        }

        fn blit_surface(
            &mut self,
            _surface: NativeHandle,
            _desc: &BlitDesc,
            _window: NativeHandle,
        ) -> bool {
            self.counts.borrow_mut().blit_surface += 1;
            true
        }
    }

    fn window_desc(extent: Extent<i32, ScreenPx>) -> WindowDesc<'static> {
        WindowDesc {
            title: "t",
            extent,
            features: WindowFeatures::default(),
            native_override: None,
        }
    }

    fn blit_desc() -> BlitDesc {
        BlitDesc {
            source: Rect::new(Point::new(0, 0), Extent::new(4, 4)),
            destination: Rect::new(Point::new(0, 0), Extent::new(4, 4)),
        }
    }

    #[test]
    fn window_lifecycle_destroys_exactly_once() {
        let (recorder, counts) = Recorder::new();
        let mut platform = Platform::with_backend(Box::new(recorder), None).unwrap();

        let mut window = platform
            .create_window(&window_desc(Extent::new(800, 600)))
            .unwrap();
        assert!(window.is_live());
        assert!(window.native_handle().is_valid());

        platform.destroy_window(&mut window);
        assert!(!window.is_live());
        assert_eq!(window.native_handle(), NativeHandle::INVALID);
        assert_eq!(window.parent, None);
        assert_eq!(counts.borrow().destroy_window, 1);

        // A second destroy is a no-op, not a second backend call.
        platform.destroy_window(&mut window);
        assert_eq!(counts.borrow().destroy_window, 1);
    }

    #[test]
    fn failed_start_is_reported() {
        let (mut recorder, counts) = Recorder::new();
        recorder.fail_start = true;

        assert!(matches!(
            Platform::with_backend(Box::new(recorder), None),
            Err(Error::BackendStart)
        ));
        assert_eq!(counts.borrow().create_backend, 1);
        // Nothing to tear down when the session never started.
        assert_eq!(counts.borrow().destroy_backend, 0);
    }

    #[test]
    fn creation_after_shutdown_never_reaches_backend() {
        let (recorder, counts) = Recorder::new();
        let mut platform = Platform::with_backend(Box::new(recorder), None).unwrap();
        platform.shutdown();

        assert!(matches!(
            platform.create_window(&window_desc(Extent::new(800, 600))),
            Err(Error::NotStarted)
        ));

        let pixels = [0u8; 64];
        let desc = SurfaceDesc {
            extent: Extent::new(4, 4),
            pixels: &pixels,
        };
        assert!(matches!(
            unsafe { platform.create_surface(&desc) },
            Err(Error::NotStarted)
        ));

        assert_eq!(counts.borrow().create_window, 0);
        assert_eq!(counts.borrow().create_surface, 0);
    }

    #[test]
    fn non_positive_extent_never_reaches_backend() {
        let (recorder, counts) = Recorder::new();
        let mut platform = Platform::with_backend(Box::new(recorder), None).unwrap();

        assert!(matches!(
            platform.create_window(&window_desc(Extent::new(0, 600))),
            Err(Error::InvalidExtent)
        ));
        assert!(matches!(
            platform.create_window(&window_desc(Extent::new(800, -1))),
            Err(Error::InvalidExtent)
        ));
        assert_eq!(counts.borrow().create_window, 0);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let (recorder, counts) = Recorder::new();
        let mut platform = Platform::with_backend(Box::new(recorder), None).unwrap();

        platform.shutdown();
        platform.shutdown();

        assert!(!platform.is_started());
        assert_eq!(platform.native_handle(), NativeHandle::INVALID);
        assert_eq!(counts.borrow().destroy_backend, 1);
    }

    #[test]
    fn drop_shuts_down_once() {
        let (recorder, counts) = Recorder::new();
        {
            let mut platform = Platform::with_backend(Box::new(recorder), None).unwrap();
            platform.shutdown();
        }
        assert_eq!(counts.borrow().destroy_backend, 1);
    }

    #[test]
    fn surface_caches_backend_pitch() {
        let (mut recorder, _counts) = Recorder::new();
        // A pitch wider than width * 4, as an aligning backend would report.
        recorder.pitch = 4096;
        let mut platform = Platform::with_backend(Box::new(recorder), None).unwrap();

        let pixels = vec![0u8; 4096 * 600];
        let desc = SurfaceDesc {
            extent: Extent::new(800, 600),
            pixels: &pixels,
        };
        let mut surface = unsafe { platform.create_surface(&desc) }.unwrap();

        assert_eq!(surface.pitch(), 4096);
        assert_eq!(surface.extent(), Extent::new(800, 600));

        platform.destroy_surface(&mut surface);
        assert!(!surface.is_live());
    }

    #[test]
    fn blit_rejects_foreign_parents() {
        let (recorder_a, counts_a) = Recorder::new();
        let (recorder_b, counts_b) = Recorder::new();
        let mut platform_a = Platform::with_backend(Box::new(recorder_a), None).unwrap();
        let mut platform_b = Platform::with_backend(Box::new(recorder_b), None).unwrap();

        let mut window = platform_a
            .create_window(&window_desc(Extent::new(800, 600)))
            .unwrap();

        let pixels = [0u8; 64];
        let desc = SurfaceDesc {
            extent: Extent::new(4, 4),
            pixels: &pixels,
        };
        let mut surface = unsafe { platform_b.create_surface(&desc) }.unwrap();

        assert!(!platform_a.blit_surface(&surface, &blit_desc(), &window));
        assert!(!platform_b.blit_surface(&surface, &blit_desc(), &window));
        assert_eq!(counts_a.borrow().blit_surface, 0);
        assert_eq!(counts_b.borrow().blit_surface, 0);

        platform_a.destroy_window(&mut window);
        platform_b.destroy_surface(&mut surface);
    }

    #[test]
    fn blit_rejects_finished_resources() {
        let (recorder, counts) = Recorder::new();
        let mut platform = Platform::with_backend(Box::new(recorder), None).unwrap();

        let mut window = platform
            .create_window(&window_desc(Extent::new(800, 600)))
            .unwrap();
        let pixels = [0u8; 64];
        let desc = SurfaceDesc {
            extent: Extent::new(4, 4),
            pixels: &pixels,
        };
        let mut surface = unsafe { platform.create_surface(&desc) }.unwrap();

        platform.destroy_window(&mut window);
        assert!(!platform.blit_surface(&surface, &blit_desc(), &window));
        assert_eq!(counts.borrow().blit_surface, 0);

        platform.destroy_surface(&mut surface);
    }

    #[test]
    fn blit_forwards_when_parents_match() {
        let (recorder, counts) = Recorder::new();
        let mut platform = Platform::with_backend(Box::new(recorder), None).unwrap();

        let mut window = platform
            .create_window(&window_desc(Extent::new(800, 600)))
            .unwrap();
        let pixels = [0u8; 64];
        let desc = SurfaceDesc {
            extent: Extent::new(4, 4),
            pixels: &pixels,
        };
        let mut surface = unsafe { platform.create_surface(&desc) }.unwrap();

        assert!(platform.blit_surface(&surface, &blit_desc(), &window));
        assert_eq!(counts.borrow().blit_surface, 1);

        platform.destroy_window(&mut window);
        platform.destroy_surface(&mut surface);
    }

    // End-to-end against the real null backend rather than the recorder.

    #[test]
    fn null_backend_full_lifecycle() {
        let mut platform = Platform::start(&PlatformDesc::default()).unwrap();
        assert!(platform.is_started());

        let mut window = platform
            .create_window(&WindowDesc {
                title: "t",
                extent: Extent::new(800, 600),
                features: WindowFeatures::default(),
                native_override: None,
            })
            .unwrap();
        assert!(window.native_handle().is_valid());

        platform.destroy_window(&mut window);
        assert_eq!(window.native_handle(), NativeHandle::INVALID);

        platform.shutdown();
        assert!(!platform.is_started());
    }

    #[test]
    fn null_backend_zero_width_window_fails() {
        let mut platform = Platform::start(&PlatformDesc::default()).unwrap();

        assert!(platform
            .create_window(&window_desc(Extent::new(0, 600)))
            .is_err());
    }

    #[test]
    fn null_backend_poll_is_always_empty() {
        let mut platform = Platform::start(&PlatformDesc::default()).unwrap();

        for _ in 0..16 {
            assert_eq!(platform.poll_event(), None);
        }
    }
}
