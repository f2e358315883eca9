//! Interactive move.

use crate::core::input::{ButtonState, PointerGrab};
use crate::core::surface::SurfaceId;
use crate::shell::Shell;

struct MoveGrab {
    surface: SurfaceId,
    /// Offset from the pointer to the surface origin at grab start.
    dx: f64,
    dy: f64,
}

impl PointerGrab for MoveGrab {
    fn focus(
        &mut self,
        _shell: &mut Shell,
        _time: u32,
        _surface: Option<SurfaceId>,
        _sx: f64,
        _sy: f64,
    ) {
        // the grab keeps the focus until released
    }

    fn motion(&mut self, shell: &mut Shell, _time: u32, x: f64, y: f64) {
        let Some(s) = shell.comp.surface(self.surface) else {
            return;
        };
        let (width, height) = (s.width, s.height);
        shell
            .comp
            .surface_configure(self.surface, x + self.dx, y + self.dy, width, height);
    }

    fn button(&mut self, shell: &mut Shell, time: u32, _button: u32, state: ButtonState) {
        if shell.comp.input.button_count == 0 && state == ButtonState::Released {
            shell.end_pointer_grab(time);
        }
    }
}

impl Shell {
    /// Starts dragging `sid` with the pointer.
    pub(crate) fn begin_move(&mut self, sid: SurfaceId, time: u32) {
        let Some(s) = self.comp.surface(sid) else {
            return;
        };
        let grab = MoveGrab {
            surface: sid,
            dx: s.x - self.comp.input.grab_x,
            dy: s.y - self.comp.input.grab_y,
        };
        self.start_pointer_grab(Box::new(grab), time);
        self.comp.input.pointer_focus = None;
    }
}
