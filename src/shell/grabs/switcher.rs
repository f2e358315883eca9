//! Keyboard window switcher.
//!
//! Holding the Super modifier and tapping Tab cycles the visible windows:
//! every candidate is dimmed, the current one drawn opaque. Dropping the
//! modifier activates the current window and restores all alphas.

use crate::core::input::{KeyState, KeyboardGrab, Modifiers, KEY_TAB};
use crate::core::surface::SurfaceId;
use crate::shell::surface::Role;
use crate::shell::Shell;

const DIM_ALPHA: u8 = 64;

#[derive(Default)]
pub(crate) struct Switcher {
    current: Option<SurfaceId>,
}

impl Switcher {
    fn eligible(role: Role) -> bool {
        matches!(role, Role::Toplevel | Role::Fullscreen | Role::Maximized)
    }

    /// Advances to the next mapped candidate in surface-list order,
    /// wrapping. With no candidates the selection stays empty.
    pub(crate) fn next(&mut self, shell: &mut Shell) {
        let mut first = None;
        let mut prev = None;
        let mut next = None;

        for sid in shell.comp.surface_ids_ordered() {
            if !Self::eligible(shell.role_of(sid)) {
                continue;
            }
            if shell.comp.layers.layer_of(sid).is_none() {
                continue;
            }
            if first.is_none() {
                first = Some(sid);
            }
            if prev == self.current {
                next = Some(sid);
            }
            prev = Some(sid);
            if let Some(s) = shell.comp.surface_mut(sid) {
                s.alpha = DIM_ALPHA;
                s.geometry_dirty = true;
            }
            shell.comp.damage(sid);
        }

        if next.is_none() {
            next = first;
        }
        self.current = next;
        if let Some(current) = next {
            if let Some(s) = shell.comp.surface_mut(current) {
                s.alpha = 255;
            }
        }
    }

    fn finish(&mut self, shell: &mut Shell, time: u32) {
        for sid in shell.comp.surface_ids_ordered() {
            if let Some(s) = shell.comp.surface_mut(sid) {
                s.alpha = 255;
            }
            shell.comp.damage(sid);
        }
        if let Some(current) = self.current {
            shell.activate(current, time);
        }
        shell.end_keyboard_grab(time);
    }
}

impl KeyboardGrab for Switcher {
    fn key(&mut self, shell: &mut Shell, time: u32, key: u32, state: KeyState) {
        if !shell.comp.input.modifiers.contains(Modifiers::SUPER) {
            self.finish(shell, time);
        } else if key == KEY_TAB && state == KeyState::Pressed {
            self.next(shell);
        }
    }

    fn surface_gone(&mut self, shell: &mut Shell, surface: SurfaceId) {
        if self.current == Some(surface) {
            self.next(shell);
        }
    }
}
