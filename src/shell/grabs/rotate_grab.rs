//! Interactive rotation.
//!
//! The surface pivots about its centre to follow the pointer. The
//! committed rotation lives on the shell-surface; the grab composes a
//! delta on top of it each motion and folds the delta in on release.

use crate::core::input::{ButtonState, PointerGrab};
use crate::core::surface::{SurfaceId, TransformTag};
use crate::shell::{Shell, ShellSurfaceId};
use crate::util::matrix::Matrix;

/// Pointer travel inside this radius leaves the rotation untouched.
const DEAD_ZONE: f64 = 20.0;

struct RotateGrab {
    shsurf: ShellSurfaceId,
    /// Rotation since grab start.
    rotation: Matrix,
    /// Surface centre in global coordinates, fixed at grab start.
    center: (f64, f64),
}

impl PointerGrab for RotateGrab {
    fn focus(
        &mut self,
        _shell: &mut Shell,
        _time: u32,
        _surface: Option<SurfaceId>,
        _sx: f64,
        _sy: f64,
    ) {
    }

    fn motion(&mut self, shell: &mut Shell, _time: u32, x: f64, y: f64) {
        let Some(ss) = shell.surfaces.get(&self.shsurf) else {
            return;
        };
        let sid = ss.surface;
        let committed = ss.rotation;
        let (width, height) = match shell.comp.surface(sid) {
            Some(s) => (s.width as f64, s.height as f64),
            None => return,
        };
        let (cx, cy) = (0.5 * width, 0.5 * height);

        let dx = x - self.center.0;
        let dy = y - self.center.1;
        let r = (dx * dx + dy * dy).sqrt();

        if let Some(s) = shell.comp.surface_mut(sid) {
            s.remove_transform(TransformTag::Rotation);
        }

        if r > DEAD_ZONE {
            self.rotation = Matrix::rotation_cols(dx / r, dy / r, -dy / r, dx / r);
            let matrix = Matrix::translation(cx, cy)
                * self.rotation
                * committed
                * Matrix::translation(-cx, -cy);
            if let Some(s) = shell.comp.surface_mut(sid) {
                s.set_transform(TransformTag::Rotation, matrix);
            }
        } else {
            if let Some(ss) = shell.surfaces.get_mut(&self.shsurf) {
                ss.rotation = Matrix::IDENTITY;
            }
            self.rotation = Matrix::IDENTITY;
        }

        // repaint lazily applies the damage from the transform update
        shell.comp.schedule_repaint();
    }

    fn button(&mut self, shell: &mut Shell, time: u32, _button: u32, state: ButtonState) {
        if shell.comp.input.button_count == 0 && state == ButtonState::Released {
            if let Some(ss) = shell.surfaces.get_mut(&self.shsurf) {
                ss.rotation = self.rotation * ss.rotation;
            }
            shell.end_pointer_grab(time);
        }
    }
}

impl Shell {
    /// Starts rotating the surface about its centre.
    pub(crate) fn begin_rotate(&mut self, ssid: ShellSurfaceId, time: u32) {
        let Some(ss) = self.surfaces.get(&ssid) else {
            return;
        };
        let sid = ss.surface;
        let (width, height) = match self.comp.surface(sid) {
            Some(s) => (s.width as f64, s.height as f64),
            None => return,
        };
        let center = self
            .comp
            .surface_to_global(sid, width / 2.0, height / 2.0);

        let dx = self.comp.input.x - center.0;
        let dy = self.comp.input.y - center.1;
        let r = (dx * dx + dy * dy).sqrt();
        if let Some(ss) = self.surfaces.get_mut(&ssid) {
            if r > DEAD_ZONE {
                // cancel the initial pointer offset so the first motion
                // does not jump
                let inverse = Matrix::rotation_cols(dx / r, -dy / r, dy / r, dx / r);
                ss.rotation = inverse * ss.rotation;
            } else {
                ss.rotation = Matrix::IDENTITY;
            }
        }

        let grab = RotateGrab {
            shsurf: ssid,
            rotation: Matrix::IDENTITY,
            center,
        };
        self.start_pointer_grab(Box::new(grab), time);
        self.comp.input.pointer_focus = None;
    }
}
