//! Input device state and the grab interface.
//!
//! The compositor tracks one seat: pointer position, pressed buttons, the
//! implicit-grab anchor, modifier state, and the foci. At most one pointer
//! grab and one keyboard grab may be installed at a time; while installed,
//! a grab sees every event before normal focus dispatch.

use bitflags::bitflags;

use crate::core::surface::SurfaceId;
use crate::shell::Shell;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modifiers: u32 {
        const CTRL = 1 << 0;
        const ALT = 1 << 1;
        const SUPER = 1 << 2;
        const SHIFT = 1 << 3;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResizeEdges: u32 {
        const TOP = 1;
        const BOTTOM = 2;
        const LEFT = 4;
        const RIGHT = 8;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Released,
    Pressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Released,
    Pressed,
}

// Evdev codes for the buttons and keys the shell binds.
pub const BTN_LEFT: u32 = 0x110;
pub const BTN_MIDDLE: u32 = 0x112;
pub const KEY_BACKSPACE: u32 = 14;
pub const KEY_TAB: u32 = 15;
pub const KEY_SPACE: u32 = 57;
pub const KEY_F9: u32 = 67;
pub const KEY_F10: u32 = 68;
pub const KEY_UP: u32 = 103;
pub const KEY_DOWN: u32 = 108;
pub const KEY_LEFTMETA: u32 = 125;
pub const KEY_BRIGHTNESSDOWN: u32 = 224;
pub const KEY_BRIGHTNESSUP: u32 = 225;

/// A pointer grab: intercepts focus changes, motion, and buttons until it
/// ends itself (or its owner dies).
pub trait PointerGrab {
    /// Called with the surface under the pointer and the position in that
    /// surface's local coordinates.
    fn focus(
        &mut self,
        shell: &mut Shell,
        time: u32,
        surface: Option<SurfaceId>,
        sx: f64,
        sy: f64,
    );

    fn motion(&mut self, shell: &mut Shell, time: u32, x: f64, y: f64);

    fn button(&mut self, shell: &mut Shell, time: u32, button: u32, state: ButtonState);
}

/// A keyboard grab: intercepts keys until it ends itself.
pub trait KeyboardGrab {
    fn key(&mut self, shell: &mut Shell, time: u32, key: u32, state: KeyState);

    /// Notification that a surface the grab may be tracking was destroyed.
    fn surface_gone(&mut self, _shell: &mut Shell, _surface: SurfaceId) {}
}

/// The seat's input state.
#[derive(Default)]
pub struct InputDevice {
    pub x: f64,
    pub y: f64,
    /// Pointer position at the moment the first button went down.
    pub grab_x: f64,
    pub grab_y: f64,
    /// Timestamp of the implicit grab; timed client requests must match it.
    pub grab_time: u32,
    pub grab_button: u32,
    pub button_count: u32,
    pub modifiers: Modifiers,
    pub pointer_focus: Option<SurfaceId>,
    pub keyboard_focus: Option<SurfaceId>,
    pub(crate) pointer_grab: Option<Box<dyn PointerGrab>>,
    pub(crate) keyboard_grab: Option<Box<dyn KeyboardGrab>>,
    pub(crate) pointer_grab_ending: bool,
    pub(crate) keyboard_grab_ending: bool,
}

impl InputDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pointer_grab(&self) -> bool {
        self.pointer_grab.is_some()
    }

    pub fn has_keyboard_grab(&self) -> bool {
        self.keyboard_grab.is_some()
    }
}

impl std::fmt::Debug for InputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDevice")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("button_count", &self.button_count)
            .field("modifiers", &self.modifiers)
            .field("pointer_focus", &self.pointer_focus)
            .field("keyboard_focus", &self.keyboard_focus)
            .field("pointer_grab", &self.pointer_grab.is_some())
            .field("keyboard_grab", &self.keyboard_grab.is_some())
            .finish()
    }
}
