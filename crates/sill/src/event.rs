use geometry::{Extent, Offset, Point, ScreenPx};

use crate::handle::NativeHandle;

/// Enumerates mouse buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Other(u16),
}

/// Symbolic name for a key on the keyboard.
///
/// Backends translate their native virtual-key codes into this enumeration;
/// keys with no symbolic name here arrive as `Unknown`.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Unknown,

    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,

    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    Escape,
    Tab,
    Space,
    Backspace,
    Enter,
    Insert,
    Delete,

    PageUp,
    PageDown,
    Home,
    End,

    Left,
    Right,
    Up,
    Down,

    LShift,
    RShift,
    LControl,
    RControl,
    LMenu,
    RMenu,
    CapsLock,
    Pause,
}

/// A stable identifier for an input device reported by the backend.
///
/// The value is backend-defined and only meaningful for matching added and
/// removed events against each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId(u64);

impl DeviceId {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Enumerates gamepad axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GamepadAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

/// Enumerates gamepad buttons, named by position rather than glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GamepadButton {
    South,
    East,
    West,
    North,
    LeftShoulder,
    RightShoulder,
    Start,
    Select,
    LeftStick,
    RightStick,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
}

/// A backend-agnostic input or system event.
///
/// One event is produced per [`Platform::poll_event`] call; the native event
/// queue itself stays inside the backend. Window events carry the native
/// handle of the window they concern, to be matched against
/// [`Window::native_handle`].
///
/// [`Platform::poll_event`]: crate::Platform::poll_event
/// [`Window::native_handle`]: crate::Window::native_handle
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// The user or the OS asked the application to exit.
    Quit,

    WindowShown {
        window: NativeHandle,
    },
    WindowHidden {
        window: NativeHandle,
    },
    WindowResized {
        window: NativeHandle,
        extent: Extent<u32, ScreenPx>,
    },
    WindowMinimized {
        window: NativeHandle,
    },
    WindowMaximized {
        window: NativeHandle,
    },
    WindowDestroyed {
        window: NativeHandle,
    },
    WindowFocusGained {
        window: NativeHandle,
    },
    WindowFocusLost {
        window: NativeHandle,
    },

    KeyDown {
        key: KeyCode,
        /// True when this event was produced by the OS key-repeat mechanism
        /// rather than a fresh press.
        repeat: bool,
    },
    KeyUp {
        key: KeyCode,
    },
    KeyboardAdded {
        device: DeviceId,
    },
    KeyboardRemoved {
        device: DeviceId,
    },

    MouseMotion {
        position: Point<i32, ScreenPx>,
        delta: Offset<i32, ScreenPx>,
    },
    MouseButtonDown {
        button: MouseButton,
        position: Point<i32, ScreenPx>,
    },
    MouseButtonUp {
        button: MouseButton,
        position: Point<i32, ScreenPx>,
    },
    /// Wheel motion in scroll ticks; `x` is horizontal, `y` vertical, away
    /// from the user being positive.
    MouseWheel {
        delta: Offset<f32, ScreenPx>,
    },
    MouseAdded {
        device: DeviceId,
    },
    MouseRemoved {
        device: DeviceId,
    },

    GamepadAxis {
        device: DeviceId,
        axis: GamepadAxis,
        /// Normalized to [-1, 1] for sticks and [0, 1] for triggers.
        value: f32,
    },
    GamepadButtonDown {
        device: DeviceId,
        button: GamepadButton,
    },
    GamepadButtonUp {
        device: DeviceId,
        button: GamepadButton,
    },
    GamepadAdded {
        device: DeviceId,
    },
    GamepadRemoved {
        device: DeviceId,
    },

    /// The contents of the system clipboard changed.
    ClipboardUpdate,

    /// A native event was polled that has no mapping to any of the tags
    /// above. Surfaced instead of dropped so callers can detect unmapped
    /// activity.
    Undefined,
}
