//! Fullscreen placement.
//!
//! A fullscreen surface is centred on its target output and backed by a
//! full-output black surface stacked directly beneath it, so undersized
//! buffers never show the desktop through.

use crate::core::layer::LayerKind;
use crate::core::output::OutputId;
use crate::core::surface::{SurfaceId, TransformTag};
use crate::shell::surface::FullscreenMethod;
use crate::shell::{Shell, ShellSurfaceId};
use crate::util::matrix::Matrix;

impl Shell {
    pub(crate) fn center_on_output(&mut self, sid: SurfaceId, output: OutputId) {
        let Some(out) = self.comp.output(output) else {
            return;
        };
        let (ox, oy) = (out.x as f64, out.y as f64);
        let mode = out.current;
        let Some(s) = self.comp.surface(sid) else {
            return;
        };
        let x = (mode.width as f64 - s.width as f64) / 2.0;
        let y = (mode.height as f64 - s.height as f64) / 2.0;
        self.comp.set_position(sid, ox + x, oy + y);
    }

    fn create_black_surface(&mut self, x: f64, y: f64, width: i32, height: i32) -> SurfaceId {
        let black = self.comp.create_surface(None);
        self.comp.surface_configure(black, x, y, width, height);
        self.comp.set_color(black, [0.0, 0.0, 0.0, 1.0]);
        black
    }

    /// Centres the surface, materializes the black backdrop, and applies
    /// the fullscreen method. Runs on map and on every later commit.
    pub(crate) fn configure_fullscreen(&mut self, ssid: ShellSurfaceId) {
        let Some(ss) = self.surfaces.get(&ssid) else {
            return;
        };
        let sid = ss.surface;
        let Some(output) = ss.fullscreen_output else {
            return;
        };
        self.center_on_output(sid, output);

        let Some(out) = self.comp.output(output) else {
            return;
        };
        let (ox, oy) = (out.x as f64, out.y as f64);
        let mode = out.current;

        let black = match self.surfaces.get(&ssid).and_then(|ss| ss.fullscreen.black_surface) {
            Some(black) => black,
            None => {
                let black =
                    self.create_black_surface(ox, oy, mode.width as i32, mode.height as i32);
                if let Some(ss) = self.surfaces.get_mut(&ssid) {
                    ss.fullscreen.black_surface = Some(black);
                }
                black
            }
        };

        // keep the backdrop glued directly beneath the surface
        self.comp.layers.remove_surface(black);
        if let Some(kind) = self.comp.layers.layer_of(sid) {
            self.comp.layers.layer_mut(kind).insert_below(sid, black);
        }
        if let Some(b) = self.comp.surface_mut(black) {
            b.output = Some(output);
        }

        let method = self
            .surfaces
            .get(&ssid)
            .map(|ss| ss.fullscreen.method)
            .unwrap_or(FullscreenMethod::Default);
        match method {
            FullscreenMethod::Scale => {
                let width = self.comp.surface(sid).map(|s| s.width).unwrap_or(0);
                if width > 0 {
                    let scale = mode.width as f64 / width as f64;
                    if let Some(s) = self.comp.surface_mut(sid) {
                        s.set_transform(TransformTag::FullscreenScale, Matrix::scale(scale, scale));
                    }
                    self.comp.set_position(sid, ox, oy);
                }
            }
            // driver delegates the mode switch; fill is reserved and takes
            // no transform
            FullscreenMethod::Default | FullscreenMethod::Driver | FullscreenMethod::Fill => {}
        }
    }

    /// Raises the fullscreen surface and its backdrop to the top of the
    /// fullscreen layer, surface first.
    pub(crate) fn stack_fullscreen(&mut self, ssid: ShellSurfaceId) {
        let Some(ss) = self.surfaces.get(&ssid) else {
            return;
        };
        let sid = ss.surface;
        let black = ss.fullscreen.black_surface;

        self.comp.layers.remove_surface(sid);
        if let Some(black) = black {
            self.comp.layers.remove_surface(black);
        }
        self.comp
            .layers
            .layer_mut(LayerKind::Fullscreen)
            .push_top(sid);
        if let Some(black) = black {
            self.comp
                .layers
                .layer_mut(LayerKind::Fullscreen)
                .insert_below(sid, black);
            self.comp.damage(black);
        }
        self.comp.damage(sid);
    }

    pub(crate) fn map_fullscreen(&mut self, ssid: ShellSurfaceId) {
        self.configure_fullscreen(ssid);
        self.stack_fullscreen(ssid);
    }
}
