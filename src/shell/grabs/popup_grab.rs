//! Popup dismissal grab.
//!
//! While a popup is mapped its client owns the pointer: events are routed
//! to whichever of the client's surfaces is under the cursor and suppressed
//! everywhere else. A release outside the client dismisses the popup, with
//! a 500 ms grace window so the opening click's release does not dismiss it
//! immediately.

use crate::core::events::ShellEvent;
use crate::core::input::{ButtonState, PointerGrab};
use crate::core::surface::{SurfaceId, TransformTag};
use crate::shell::{Shell, ShellSurfaceId};
use crate::util::matrix::Matrix;

const INITIAL_UP_WINDOW_MS: u32 = 500;

struct PopupGrab {
    shsurf: ShellSurfaceId,
}

impl PointerGrab for PopupGrab {
    fn focus(
        &mut self,
        shell: &mut Shell,
        _time: u32,
        surface: Option<SurfaceId>,
        _sx: f64,
        _sy: f64,
    ) {
        let owner = shell.surfaces.get(&self.shsurf).map(|ss| ss.client);
        let focus = surface.filter(|&sid| {
            shell
                .comp
                .surface(sid)
                .map(|s| s.client.is_some() && s.client == owner)
                .unwrap_or(false)
        });
        shell.comp.input.pointer_focus = focus;
    }

    fn motion(&mut self, shell: &mut Shell, time: u32, x: f64, y: f64) {
        if let Some(focus) = shell.comp.input.pointer_focus {
            let (sx, sy) = shell.comp.surface_from_global(focus, x, y);
            shell.comp.pending_events.push(ShellEvent::PointerMotion {
                surface: focus,
                time,
                sx,
                sy,
            });
        }
    }

    fn button(&mut self, shell: &mut Shell, time: u32, button: u32, state: ButtonState) {
        if let Some(focus) = shell.comp.input.pointer_focus {
            shell.comp.pending_events.push(ShellEvent::PointerButton {
                surface: focus,
                time,
                button,
                state,
            });
        } else if state == ButtonState::Released {
            let done = shell
                .surfaces
                .get(&self.shsurf)
                .map(|ss| {
                    ss.popup.initial_up
                        || time.wrapping_sub(ss.popup.time) > INITIAL_UP_WINDOW_MS
                })
                .unwrap_or(true);
            if done {
                let surface = shell.surfaces.get(&self.shsurf).map(|ss| ss.surface);
                if let Some(surface) = surface {
                    shell
                        .comp
                        .pending_events
                        .push(ShellEvent::PopupDone { surface });
                }
                if let Some(ss) = shell.surfaces.get_mut(&self.shsurf) {
                    ss.popup.active = false;
                }
                shell.end_pointer_grab(time);
            }
        }

        if state == ButtonState::Released {
            if let Some(ss) = shell.surfaces.get_mut(&self.shsurf) {
                ss.popup.initial_up = true;
            }
        }
    }
}

impl Shell {
    /// Positions a freshly mapped popup against its parent and takes the
    /// pointer on behalf of the popup's client.
    pub(crate) fn map_popup(&mut self, ssid: ShellSurfaceId) {
        let Some(ss) = self.surfaces.get(&ssid) else {
            return;
        };
        let sid = ss.surface;
        let (px, py) = (ss.popup.x, ss.popup.y);
        let Some(parent_sid) = ss
            .parent
            .and_then(|p| self.surfaces.get(&p))
            .map(|p| p.surface)
        else {
            return;
        };

        // the popup lives on its parent's output and inherits the parent's
        // transform, so it follows an already-rotated parent
        let (parent_output, snapshot) = match self.comp.surface(parent_sid) {
            Some(p) => {
                let snap = if p.transform_enabled {
                    p.transform
                } else {
                    Matrix::translation(p.x, p.y)
                };
                (p.output, snap)
            }
            None => return,
        };
        if let Some(s) = self.comp.surface_mut(sid) {
            s.output = parent_output;
            s.set_transform(TransformTag::ParentSnapshot, snapshot);
        }
        self.comp.set_position(sid, px, py);

        let time = self.comp.input.grab_time;
        if let Some(ss) = self.surfaces.get_mut(&ssid) {
            ss.popup.time = time;
            ss.popup.initial_up = false;
            ss.popup.active = true;
        }
        self.start_pointer_grab(Box::new(PopupGrab { shsurf: ssid }), time);
    }
}
