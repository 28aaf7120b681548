use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
};

use geometry::{Extent, Offset, Point, SurfacePx};
use structures::{HandlePool, PoolHandle};

use windows::core::PCWSTR;
#[allow(clippy::wildcard_imports)]
use windows::Win32::{
    Foundation::{HANDLE, HINSTANCE, HMODULE, HWND, LPARAM, LRESULT, WPARAM},
    Graphics::Gdi::{
        GetDC, ReleaseDC, StretchDIBits, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS,
        SRCCOPY,
    },
    System::{DataExchange::AddClipboardFormatListener, LibraryLoader::GetModuleHandleW},
    UI::{
        Input::{
            GetRawInputDeviceInfoW, RegisterRawInputDevices, RAWINPUTDEVICE, RIDEV_DEVNOTIFY,
            RIDI_DEVICEINFO, RID_DEVICE_INFO, RIM_TYPEHID, RIM_TYPEKEYBOARD, RIM_TYPEMOUSE,
        },
        WindowsAndMessaging::*,
    },
};

use crate::{
    backend::{Backend, CreatedSurface, NativeOverride, WindowOverride},
    event::{DeviceId, Event, KeyCode, MouseButton},
    handle::NativeHandle,
    platform::{BlitDesc, SurfaceDesc, WindowDesc, WindowFeatures},
};

// Not surfaced by the WindowsAndMessaging module in every metadata revision.
const WM_CLIPBOARDUPDATE: u32 = 0x031D;
const WM_INPUT_DEVICE_CHANGE: u32 = 0x00FE;
const GIDC_ARRIVAL: u32 = 1;
const GIDC_REMOVAL: u32 = 2;

/// One-bit-to-one-bit translation of abstract window features into native
/// window styles. Each row owns exactly one native bit; the composition logic
/// in `create_window` never touches these bits for any other reason.
const STYLE_MAP: [(WindowFeatures, WINDOW_STYLE); 4] = [
    (WindowFeatures::BORDERLESS, WS_POPUP),
    (WindowFeatures::RESIZABLE, WS_THICKFRAME),
    (WindowFeatures::MINIMIZED, WS_MINIMIZE),
    (WindowFeatures::MAXIMIZED, WS_MAXIMIZE),
];

/// Fullscreen has no `WS_*` bit of its own; it lands in the extended style
/// and gets its monitor-sized geometry in `create_window`.
const EX_STYLE_MAP: [(WindowFeatures, WINDOW_EX_STYLE); 1] =
    [(WindowFeatures::FULLSCREEN, WS_EX_TOPMOST)];

fn translate_window_features(features: WindowFeatures) -> (WINDOW_STYLE, WINDOW_EX_STYLE) {
    let mut style = WINDOW_STYLE(0);
    let mut ex_style = WINDOW_EX_STYLE(0);

    for (flag, native) in STYLE_MAP {
        if features.contains(flag) {
            style |= native;
        }
    }
    for (flag, native) in EX_STYLE_MAP {
        if features.contains(flag) {
            ex_style |= native;
        }
    }

    (style, ex_style)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DeviceClass {
    Keyboard,
    Mouse,
    Gamepad,
}

thread_local! {
    // Events translated by the window procedure, waiting to be polled. The
    // message pump and every window live on the same thread (the OS requires
    // it), so one queue per thread is one queue per session.
    static QUEUE: RefCell<VecDeque<Event>> = RefCell::new(VecDeque::new());

    // Last cursor position, for deriving motion deltas.
    static MOUSE: Cell<(i32, i32)> = Cell::new((0, 0));

    // Device class by raw-input handle. Removal notifications arrive after
    // the device is gone, when the OS can no longer tell us what it was.
    static DEVICES: RefCell<HashMap<isize, DeviceClass>> = RefCell::new(HashMap::new());
}

fn push_event(event: Event) {
    QUEUE.with(|queue| queue.borrow_mut().push_back(event));
}

fn pop_event() -> Option<Event> {
    QUEUE.with(|queue| queue.borrow_mut().pop_front())
}

struct DibSurface {
    pixels: *const u8,
    extent: Extent<i32, SurfacePx>,
}

/// Forwards every capability call to the Win32 API.
///
/// Windows are `CreateWindowExW` windows identified by their `HWND` bits;
/// surfaces are device-independent bitmaps over the caller's buffer, pushed
/// to a window with `StretchDIBits`. Native messages are translated in the
/// window procedure and drained one at a time by `poll_event`.
pub struct Win32Backend {
    class_name: Vec<u16>,
    atom: u16,
    instance: HMODULE,
    surfaces: HandlePool<DibSurface>,
    raw_input_registered: bool,
}

impl Default for Win32Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl Win32Backend {
    const BYTES_PER_PIXEL: u32 = 4;

    #[must_use]
    pub fn new() -> Self {
        Self {
            class_name: utf16z("sill_window"),
            atom: 0,
            instance: HMODULE::default(),
            surfaces: HandlePool::new(),
            raw_input_registered: false,
        }
    }

    fn register_raw_input(&mut self, hwnd: HWND) {
        if self.raw_input_registered {
            return;
        }

        // Generic desktop page: mouse, gamepad, keyboard.
        let devices = [0x02u16, 0x05, 0x06].map(|usage| RAWINPUTDEVICE {
            usUsagePage: 0x01,
            usUsage: usage,
            dwFlags: RIDEV_DEVNOTIFY,
            hwndTarget: hwnd,
        });

        let registered = unsafe {
            RegisterRawInputDevices(&devices, std::mem::size_of::<RAWINPUTDEVICE>() as u32)
        };
        if !registered.as_bool() {
            log::warn!("raw input registration failed; device add/remove events unavailable");
        }
        self.raw_input_registered = true;
    }
}

impl Backend for Win32Backend {
    fn create_backend(&mut self, overrides: Option<&NativeOverride>) -> NativeHandle {
        if let Some(NativeOverride::Win32(config)) = overrides {
            if let Some(name) = &config.class_name {
                self.class_name = utf16z(name);
            }
        }

        let Ok(instance) = (unsafe { GetModuleHandleW(None) }) else {
            return NativeHandle::INVALID;
        };
        self.instance = instance;

        let class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(wndproc),
            hInstance: instance.into(),
            hCursor: unsafe { LoadCursorW(HINSTANCE::default(), IDC_ARROW) }.unwrap_or_default(),
            lpszClassName: PCWSTR(self.class_name.as_ptr()),
            ..Default::default()
        };

        self.atom = unsafe { RegisterClassExW(&class) };
        if self.atom == 0 {
            return NativeHandle::INVALID;
        }

        NativeHandle::from_raw(u64::from(self.atom))
    }

    fn destroy_backend(&mut self, _backend: NativeHandle) {
        if self.atom != 0 {
            unsafe {
                UnregisterClassW(PCWSTR(self.class_name.as_ptr()), self.instance);
            }
            self.atom = 0;
        }
        self.surfaces.clear();
        self.raw_input_registered = false;
        QUEUE.with(|queue| queue.borrow_mut().clear());
        DEVICES.with(|devices| devices.borrow_mut().clear());
    }

    fn poll_event(&mut self, _backend: NativeHandle) -> Option<Event> {
        if let Some(event) = pop_event() {
            return Some(event);
        }

        let mut msg = MSG::default();
        if !unsafe { PeekMessageW(&mut msg, HWND(0), 0, 0, PM_REMOVE) }.as_bool() {
            return None;
        }
        if msg.message == WM_QUIT {
            return Some(Event::Quit);
        }

        unsafe {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        // One native message maps to at most one event; a message the window
        // procedure did not recognize is reported rather than swallowed.
        Some(pop_event().unwrap_or(Event::Undefined))
    }

    fn create_window(&mut self, desc: &WindowDesc, _backend: NativeHandle) -> NativeHandle {
        let (mut style, mut ex_style) = translate_window_features(desc.features);

        style |= WS_VISIBLE;
        if !desc
            .features
            .intersects(WindowFeatures::BORDERLESS | WindowFeatures::FULLSCREEN)
        {
            style |= WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX;
            if desc.features.contains(WindowFeatures::RESIZABLE) {
                style |= WS_MAXIMIZEBOX;
            }
        }

        if let Some(WindowOverride::Win32(config)) = desc.native_override {
            ex_style |= WINDOW_EX_STYLE(config.ex_style);
        }

        let (x, y, width, height) = if desc.features.contains(WindowFeatures::FULLSCREEN) {
            (0, 0, unsafe { GetSystemMetrics(SM_CXSCREEN) }, unsafe {
                GetSystemMetrics(SM_CYSCREEN)
            })
        } else {
            (
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                desc.extent.width,
                desc.extent.height,
            )
        };

        let title = utf16z(desc.title);
        let hwnd = unsafe {
            CreateWindowExW(
                ex_style,
                PCWSTR(self.class_name.as_ptr()),
                PCWSTR(title.as_ptr()),
                style,
                x,
                y,
                width,
                height,
                HWND(0),
                HMENU(0),
                self.instance,
                None,
            )
        };
        if hwnd.0 == 0 {
            return NativeHandle::INVALID;
        }

        if !unsafe { AddClipboardFormatListener(hwnd) }.as_bool() {
            log::warn!("clipboard listener registration failed; no clipboard events");
        }
        self.register_raw_input(hwnd);

        NativeHandle::from_raw(hwnd.0 as u64)
    }

    fn destroy_window(&mut self, window: NativeHandle) {
        unsafe {
            DestroyWindow(HWND(window.raw() as isize));
        }
    }

    fn create_surface(&mut self, desc: &SurfaceDesc, _backend: NativeHandle) -> CreatedSurface {
        // DIB rows are DWORD-aligned; at 32 bits per pixel that is exactly
        // one row of pixels.
        let pitch = desc.extent.width as u32 * Self::BYTES_PER_PIXEL;
        if desc.pixels.len() < pitch as usize * desc.extent.height as usize {
            return CreatedSurface::INVALID;
        }

        let handle = self.surfaces.insert(DibSurface {
            pixels: desc.pixels.as_ptr(),
            extent: desc.extent,
        });

        CreatedSurface {
            handle: NativeHandle::from_raw(handle.raw()),
            pitch,
        }
    }

    fn destroy_surface(&mut self, surface: NativeHandle) {
        let removed = PoolHandle::from_raw(surface.raw()).and_then(|h| self.surfaces.remove(h));
        if removed.is_none() {
            log::warn!("win32 backend asked to destroy an unknown surface handle");
        }
    }

    fn blit_surface(
        &mut self,
        surface: NativeHandle,
        desc: &BlitDesc,
        window: NativeHandle,
    ) -> bool {
        let Some(surface) = PoolHandle::from_raw(surface.raw()).and_then(|h| self.surfaces.get(h))
        else {
            return false;
        };

        let hwnd = HWND(window.raw() as isize);
        let hdc = unsafe { GetDC(hwnd) };
        if hdc.is_invalid() {
            return false;
        }

        let mut info = BITMAPINFO::default();
        info.bmiHeader = BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: surface.extent.width,
            // Negative height selects top-down row order, matching the
            // surface contract.
            biHeight: -surface.extent.height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        };

        let rows = unsafe {
            StretchDIBits(
                hdc,
                desc.destination.origin().x,
                desc.destination.origin().y,
                desc.destination.width(),
                desc.destination.height(),
                desc.source.origin().x,
                desc.source.origin().y,
                desc.source.width(),
                desc.source.height(),
                Some(surface.pixels.cast()),
                &info,
                DIB_RGB_COLORS,
                SRCCOPY,
            )
        };

        unsafe {
            ReleaseDC(hwnd, hdc);
        }

        rows != 0
    }
}

fn utf16z(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(Some(0)).collect()
}

fn handle_of(hwnd: HWND) -> NativeHandle {
    NativeHandle::from_raw(hwnd.0 as u64)
}

fn cursor_position(lparam: LPARAM) -> Point<i32, geometry::ScreenPx> {
    Point::new(
        (lparam.0 & 0xFFFF) as i16 as i32,
        ((lparam.0 >> 16) & 0xFFFF) as i16 as i32,
    )
}

fn wheel_ticks(wparam: WPARAM) -> f32 {
    f32::from(((wparam.0 >> 16) & 0xFFFF) as u16 as i16) / WHEEL_DELTA as f32
}

fn query_device_class(device: HANDLE) -> Option<DeviceClass> {
    let mut info = RID_DEVICE_INFO {
        cbSize: std::mem::size_of::<RID_DEVICE_INFO>() as u32,
        ..Default::default()
    };
    let mut size = std::mem::size_of::<RID_DEVICE_INFO>() as u32;

    let written = unsafe {
        GetRawInputDeviceInfoW(
            device,
            RIDI_DEVICEINFO,
            Some((&mut info as *mut RID_DEVICE_INFO).cast()),
            &mut size,
        )
    };
    if written == 0 || written == u32::MAX {
        return None;
    }

    match info.dwType {
        RIM_TYPEKEYBOARD => Some(DeviceClass::Keyboard),
        RIM_TYPEMOUSE => Some(DeviceClass::Mouse),
        RIM_TYPEHID => {
            // SAFETY: dwType says the hid member of the union is the live one.
            let hid = unsafe { info.Anonymous.hid };
            (hid.usUsagePage == 0x01 && (hid.usUsage == 0x04 || hid.usUsage == 0x05))
                .then_some(DeviceClass::Gamepad)
        }
        _ => None,
    }
}

fn device_change_event(wparam: WPARAM, lparam: LPARAM) -> Event {
    let device = DeviceId::from_raw(lparam.0 as u64);

    let class = match wparam.0 as u32 {
        GIDC_ARRIVAL => {
            let class = query_device_class(HANDLE(lparam.0));
            if let Some(class) = class {
                DEVICES.with(|devices| devices.borrow_mut().insert(lparam.0, class));
            }
            class
        }
        GIDC_REMOVAL => DEVICES.with(|devices| devices.borrow_mut().remove(&lparam.0)),
        _ => None,
    };

    match (wparam.0 as u32, class) {
        (GIDC_ARRIVAL, Some(DeviceClass::Keyboard)) => Event::KeyboardAdded { device },
        (GIDC_ARRIVAL, Some(DeviceClass::Mouse)) => Event::MouseAdded { device },
        (GIDC_ARRIVAL, Some(DeviceClass::Gamepad)) => Event::GamepadAdded { device },
        (GIDC_REMOVAL, Some(DeviceClass::Keyboard)) => Event::KeyboardRemoved { device },
        (GIDC_REMOVAL, Some(DeviceClass::Mouse)) => Event::MouseRemoved { device },
        (GIDC_REMOVAL, Some(DeviceClass::Gamepad)) => Event::GamepadRemoved { device },
        _ => Event::Undefined,
    }
}

unsafe extern "system" fn wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_CLOSE => {
            // The application decides whether the window actually goes away.
            push_event(Event::Quit);
            return LRESULT(0);
        }
        WM_DESTROY => push_event(Event::WindowDestroyed {
            window: handle_of(hwnd),
        }),
        WM_SHOWWINDOW => push_event(if wparam.0 != 0 {
            Event::WindowShown {
                window: handle_of(hwnd),
            }
        } else {
            Event::WindowHidden {
                window: handle_of(hwnd),
            }
        }),
        WM_SIZE => push_event(match wparam.0 as u32 {
            SIZE_MINIMIZED => Event::WindowMinimized {
                window: handle_of(hwnd),
            },
            SIZE_MAXIMIZED => Event::WindowMaximized {
                window: handle_of(hwnd),
            },
            _ => Event::WindowResized {
                window: handle_of(hwnd),
                extent: Extent::new(
                    (lparam.0 & 0xFFFF) as u32,
                    ((lparam.0 >> 16) & 0xFFFF) as u32,
                ),
            },
        }),
        WM_SETFOCUS => push_event(Event::WindowFocusGained {
            window: handle_of(hwnd),
        }),
        WM_KILLFOCUS => push_event(Event::WindowFocusLost {
            window: handle_of(hwnd),
        }),
        WM_KEYDOWN | WM_SYSKEYDOWN => push_event(Event::KeyDown {
            key: translate_key(wparam),
            // Bit 30 is the previous key state; set means auto-repeat.
            repeat: (lparam.0 >> 30) & 1 == 1,
        }),
        WM_KEYUP | WM_SYSKEYUP => push_event(Event::KeyUp {
            key: translate_key(wparam),
        }),
        WM_MOUSEMOVE => {
            let position = cursor_position(lparam);
            let last = MOUSE.with(|mouse| mouse.replace((position.x, position.y)));
            push_event(Event::MouseMotion {
                position,
                delta: Offset::new(position.x - last.0, position.y - last.1),
            });
        }
        WM_LBUTTONDOWN => push_event(Event::MouseButtonDown {
            button: MouseButton::Left,
            position: cursor_position(lparam),
        }),
        WM_LBUTTONUP => push_event(Event::MouseButtonUp {
            button: MouseButton::Left,
            position: cursor_position(lparam),
        }),
        WM_RBUTTONDOWN => push_event(Event::MouseButtonDown {
            button: MouseButton::Right,
            position: cursor_position(lparam),
        }),
        WM_RBUTTONUP => push_event(Event::MouseButtonUp {
            button: MouseButton::Right,
            position: cursor_position(lparam),
        }),
        WM_MBUTTONDOWN => push_event(Event::MouseButtonDown {
            button: MouseButton::Middle,
            position: cursor_position(lparam),
        }),
        WM_MBUTTONUP => push_event(Event::MouseButtonUp {
            button: MouseButton::Middle,
            position: cursor_position(lparam),
        }),
        WM_XBUTTONDOWN => push_event(Event::MouseButtonDown {
            button: MouseButton::Other(((wparam.0 >> 16) & 0xFFFF) as u16),
            position: cursor_position(lparam),
        }),
        WM_XBUTTONUP => push_event(Event::MouseButtonUp {
            button: MouseButton::Other(((wparam.0 >> 16) & 0xFFFF) as u16),
            position: cursor_position(lparam),
        }),
        WM_MOUSEWHEEL => push_event(Event::MouseWheel {
            delta: Offset::new(0.0, wheel_ticks(wparam)),
        }),
        WM_MOUSEHWHEEL => push_event(Event::MouseWheel {
            delta: Offset::new(wheel_ticks(wparam), 0.0),
        }),
        WM_CLIPBOARDUPDATE => push_event(Event::ClipboardUpdate),
        WM_INPUT_DEVICE_CHANGE => {
            push_event(device_change_event(wparam, lparam));
            return LRESULT(0);
        }
        _ => {}
    }

    DefWindowProcW(hwnd, msg, wparam, lparam)
}

fn translate_key(wparam: WPARAM) -> KeyCode {
    const DIGITS: [KeyCode; 10] = [
        KeyCode::Key0,
        KeyCode::Key1,
        KeyCode::Key2,
        KeyCode::Key3,
        KeyCode::Key4,
        KeyCode::Key5,
        KeyCode::Key6,
        KeyCode::Key7,
        KeyCode::Key8,
        KeyCode::Key9,
    ];
    const LETTERS: [KeyCode; 26] = [
        KeyCode::A,
        KeyCode::B,
        KeyCode::C,
        KeyCode::D,
        KeyCode::E,
        KeyCode::F,
        KeyCode::G,
        KeyCode::H,
        KeyCode::I,
        KeyCode::J,
        KeyCode::K,
        KeyCode::L,
        KeyCode::M,
        KeyCode::N,
        KeyCode::O,
        KeyCode::P,
        KeyCode::Q,
        KeyCode::R,
        KeyCode::S,
        KeyCode::T,
        KeyCode::U,
        KeyCode::V,
        KeyCode::W,
        KeyCode::X,
        KeyCode::Y,
        KeyCode::Z,
    ];
    const FUNCTION: [KeyCode; 12] = [
        KeyCode::F1,
        KeyCode::F2,
        KeyCode::F3,
        KeyCode::F4,
        KeyCode::F5,
        KeyCode::F6,
        KeyCode::F7,
        KeyCode::F8,
        KeyCode::F9,
        KeyCode::F10,
        KeyCode::F11,
        KeyCode::F12,
    ];

    use windows::Win32::UI::Input::KeyboardAndMouse::*;

    let raw = wparam.0 as u16;
    match raw {
        0x30..=0x39 => DIGITS[(raw - 0x30) as usize],
        0x41..=0x5A => LETTERS[(raw - 0x41) as usize],
        0x70..=0x7B => FUNCTION[(raw - 0x70) as usize],
        _ => match VIRTUAL_KEY(raw) {
            VK_ESCAPE => KeyCode::Escape,
            VK_TAB => KeyCode::Tab,
            VK_SPACE => KeyCode::Space,
            VK_BACK => KeyCode::Backspace,
            VK_RETURN => KeyCode::Enter,
            VK_INSERT => KeyCode::Insert,
            VK_DELETE => KeyCode::Delete,
            VK_PRIOR => KeyCode::PageUp,
            VK_NEXT => KeyCode::PageDown,
            VK_HOME => KeyCode::Home,
            VK_END => KeyCode::End,
            VK_LEFT => KeyCode::Left,
            VK_RIGHT => KeyCode::Right,
            VK_UP => KeyCode::Up,
            VK_DOWN => KeyCode::Down,
            // WM_KEYDOWN reports the generic modifier keys, not the sided
            // ones.
            VK_SHIFT | VK_LSHIFT => KeyCode::LShift,
            VK_RSHIFT => KeyCode::RShift,
            VK_CONTROL | VK_LCONTROL => KeyCode::LControl,
            VK_RCONTROL => KeyCode::RControl,
            VK_MENU | VK_LMENU => KeyCode::LMenu,
            VK_RMENU => KeyCode::RMenu,
            VK_CAPITAL => KeyCode::CapsLock,
            VK_PAUSE => KeyCode::Pause,
            _ => KeyCode::Unknown,
        },
    }
}
