//! Interactive resize.
//!
//! The grab never resizes anything itself: it derives the requested size
//! from the pointer's travel in surface-local coordinates and sends the
//! client a configure event each motion. The client commits the new buffer
//! at its leisure.

use crate::core::events::ShellEvent;
use crate::core::input::{ButtonState, PointerGrab, ResizeEdges};
use crate::core::surface::SurfaceId;
use crate::shell::surface::Role;
use crate::shell::{Shell, ShellSurfaceId};

struct ResizeGrab {
    shsurf: ShellSurfaceId,
    edges: ResizeEdges,
    /// Surface size at grab start.
    width: i32,
    height: i32,
}

impl PointerGrab for ResizeGrab {
    fn focus(
        &mut self,
        _shell: &mut Shell,
        _time: u32,
        _surface: Option<SurfaceId>,
        _sx: f64,
        _sy: f64,
    ) {
    }

    fn motion(&mut self, shell: &mut Shell, time: u32, x: f64, y: f64) {
        let Some(ss) = shell.surfaces.get(&self.shsurf) else {
            return;
        };
        let sid = ss.surface;
        let input = &shell.comp.input;
        let (from_x, from_y) = shell
            .comp
            .surface_from_global(sid, input.grab_x, input.grab_y);
        let (to_x, to_y) = shell.comp.surface_from_global(sid, x, y);

        let width = if self.edges.contains(ResizeEdges::LEFT) {
            self.width + (from_x - to_x) as i32
        } else if self.edges.contains(ResizeEdges::RIGHT) {
            self.width + (to_x - from_x) as i32
        } else {
            self.width
        };
        let height = if self.edges.contains(ResizeEdges::TOP) {
            self.height + (from_y - to_y) as i32
        } else if self.edges.contains(ResizeEdges::BOTTOM) {
            self.height + (to_y - from_y) as i32
        } else {
            self.height
        };

        shell.comp.pending_events.push(ShellEvent::Configure {
            surface: sid,
            time,
            edges: self.edges,
            width,
            height,
        });
    }

    fn button(&mut self, shell: &mut Shell, time: u32, _button: u32, state: ButtonState) {
        if shell.comp.input.button_count == 0 && state == ButtonState::Released {
            shell.end_pointer_grab(time);
        }
    }
}

impl Shell {
    /// Starts resizing along `edges`. Bad edge masks and fullscreen
    /// surfaces are silent no-ops.
    pub(crate) fn begin_resize(&mut self, ssid: ShellSurfaceId, time: u32, edges: ResizeEdges) {
        let Some(ss) = self.surfaces.get(&ssid) else {
            return;
        };
        if ss.role == Role::Fullscreen {
            return;
        }
        if edges.is_empty()
            || edges.contains(ResizeEdges::TOP | ResizeEdges::BOTTOM)
            || edges.contains(ResizeEdges::LEFT | ResizeEdges::RIGHT)
        {
            return;
        }
        let Some(s) = self.comp.surface(ss.surface) else {
            return;
        };
        let grab = ResizeGrab {
            shsurf: ssid,
            edges,
            width: s.width,
            height: s.height,
        };
        self.start_pointer_grab(Box::new(grab), time);
        self.comp.input.pointer_focus = None;
    }
}
