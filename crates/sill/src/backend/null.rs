use geometry::{Extent, ScreenPx, SurfacePx};
use structures::{HandlePool, PoolHandle};

use crate::{
    backend::{Backend, CreatedSurface, NativeOverride},
    event::Event,
    handle::NativeHandle,
    platform::{BlitDesc, SurfaceDesc, WindowDesc, WindowFeatures},
};

struct NullWindow {
    #[allow(dead_code)]
    extent: Extent<i32, ScreenPx>,
    #[allow(dead_code)]
    features: WindowFeatures,
}

struct NullSurface {
    #[allow(dead_code)]
    extent: Extent<i32, SurfacePx>,
    #[allow(dead_code)]
    pitch: u32,
}

/// A backend that satisfies the full capability contract without touching any
/// OS resource.
///
/// Creation calls mint real generational handles, so stale-handle misuse is
/// still detected; `poll_event` never reports anything. Intended for logic
/// tests and headless execution.
pub struct NullBackend {
    windows: HandlePool<NullWindow>,
    surfaces: HandlePool<NullSurface>,
    log_actions: bool,
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NullBackend {
    const BACKEND_TOKEN: u64 = 1;
    const BYTES_PER_PIXEL: u32 = 4;

    #[must_use]
    pub fn new() -> Self {
        Self {
            windows: HandlePool::new(),
            surfaces: HandlePool::new(),
            log_actions: false,
        }
    }

    fn trace(&self, action: &str) {
        if self.log_actions {
            log::debug!("null backend: {action}");
        }
    }
}

impl Backend for NullBackend {
    fn create_backend(&mut self, overrides: Option<&NativeOverride>) -> NativeHandle {
        if let Some(NativeOverride::Null(config)) = overrides {
            self.log_actions = config.log_actions;
        }

        self.trace("create_backend");

        // There is no session state to point at, so the handle is a token.
        NativeHandle::from_raw(Self::BACKEND_TOKEN)
    }

    fn destroy_backend(&mut self, _backend: NativeHandle) {
        self.trace("destroy_backend");
        self.windows.clear();
        self.surfaces.clear();
    }

    fn poll_event(&mut self, _backend: NativeHandle) -> Option<Event> {
        None
    }

    fn create_window(&mut self, desc: &WindowDesc, _backend: NativeHandle) -> NativeHandle {
        self.trace("create_window");

        let handle = self.windows.insert(NullWindow {
            extent: desc.extent,
            features: desc.features,
        });
        NativeHandle::from_raw(handle.raw())
    }

    fn destroy_window(&mut self, window: NativeHandle) {
        self.trace("destroy_window");

        let removed = PoolHandle::from_raw(window.raw()).and_then(|h| self.windows.remove(h));
        if removed.is_none() {
            log::warn!("null backend asked to destroy an unknown window handle");
        }
    }

    fn create_surface(&mut self, desc: &SurfaceDesc, _backend: NativeHandle) -> CreatedSurface {
        self.trace("create_surface");

        let pitch = desc.extent.width as u32 * Self::BYTES_PER_PIXEL;
        if desc.pixels.len() < pitch as usize * desc.extent.height as usize {
            return CreatedSurface::INVALID;
        }

        let handle = self.surfaces.insert(NullSurface {
            extent: desc.extent,
            pitch,
        });
        CreatedSurface {
            handle: NativeHandle::from_raw(handle.raw()),
            pitch,
        }
    }

    fn destroy_surface(&mut self, surface: NativeHandle) {
        self.trace("destroy_surface");

        let removed = PoolHandle::from_raw(surface.raw()).and_then(|h| self.surfaces.remove(h));
        if removed.is_none() {
            log::warn!("null backend asked to destroy an unknown surface handle");
        }
    }

    fn blit_surface(
        &mut self,
        surface: NativeHandle,
        _desc: &BlitDesc,
        window: NativeHandle,
    ) -> bool {
        self.trace("blit_surface");

        let surface_live = PoolHandle::from_raw(surface.raw())
            .map(|h| self.surfaces.contains(h))
            .unwrap_or(false);
        let window_live = PoolHandle::from_raw(window.raw())
            .map(|h| self.windows.contains(h))
            .unwrap_or(false);

        surface_live && window_live
    }
}

#[cfg(test)]
mod tests {
    use geometry::{Point, Rect};

    use super::*;

    const BACKEND: NativeHandle = NativeHandle::from_raw(NullBackend::BACKEND_TOKEN);

    fn window_desc() -> WindowDesc<'static> {
        WindowDesc {
            title: "t",
            extent: Extent::new(800, 600),
            features: WindowFeatures::default(),
            native_override: None,
        }
    }

    fn surface_desc(pixels: &[u8]) -> SurfaceDesc {
        SurfaceDesc {
            extent: Extent::new(8, 8),
            pixels,
        }
    }

    fn blit_desc() -> BlitDesc {
        BlitDesc {
            source: Rect::new(Point::new(0, 0), Extent::new(8, 8)),
            destination: Rect::new(Point::new(0, 0), Extent::new(8, 8)),
        }
    }

    #[test]
    fn start_returns_nonzero_token() {
        let mut backend = NullBackend::new();
        assert!(backend.create_backend(None).is_valid());
    }

    #[test]
    fn handles_are_nonzero_and_distinct() {
        let mut backend = NullBackend::new();
        let _ = backend.create_backend(None);

        let a = backend.create_window(&window_desc(), BACKEND);
        let b = backend.create_window(&window_desc(), BACKEND);

        assert!(a.is_valid());
        assert!(b.is_valid());
        assert_ne!(a, b);
    }

    #[test]
    fn poll_never_reports_events() {
        let mut backend = NullBackend::new();
        let _ = backend.create_backend(None);

        for _ in 0..16 {
            assert_eq!(backend.poll_event(BACKEND), None);
        }
    }

    #[test]
    fn surface_pitch_is_four_bytes_per_pixel() {
        let mut backend = NullBackend::new();
        let _ = backend.create_backend(None);

        let pixels = [0u8; 8 * 8 * 4];
        let created = backend.create_surface(&surface_desc(&pixels), BACKEND);

        assert!(created.handle.is_valid());
        assert_eq!(created.pitch, 32);
    }

    #[test]
    fn undersized_buffer_is_rejected() {
        let mut backend = NullBackend::new();
        let _ = backend.create_backend(None);

        let pixels = [0u8; 8 * 8 * 4 - 1];
        let created = backend.create_surface(&surface_desc(&pixels), BACKEND);

        assert!(!created.handle.is_valid());
    }

    #[test]
    fn blit_requires_live_handles() {
        let mut backend = NullBackend::new();
        let _ = backend.create_backend(None);

        let window = backend.create_window(&window_desc(), BACKEND);
        let pixels = [0u8; 8 * 8 * 4];
        let surface = backend.create_surface(&surface_desc(&pixels), BACKEND).handle;

        assert!(backend.blit_surface(surface, &blit_desc(), window));

        backend.destroy_surface(surface);
        assert!(!backend.blit_surface(surface, &blit_desc(), window));

        backend.destroy_window(window);
        assert!(!backend.blit_surface(surface, &blit_desc(), window));
    }

    #[test]
    fn destroy_backend_invalidates_children() {
        let mut backend = NullBackend::new();
        let _ = backend.create_backend(None);

        let window = backend.create_window(&window_desc(), BACKEND);
        backend.destroy_backend(BACKEND);

        assert!(!backend.blit_surface(NativeHandle::INVALID, &blit_desc(), window));
    }
}
