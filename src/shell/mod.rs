//! Window management policy.
//!
//! [`Shell`] owns the role table, the layer discipline, the grab engines,
//! the lock orchestration, and the helper supervision. The host compositor
//! drives it exclusively through the hook methods here: `map`, `configure`,
//! `lock`, `unlock`, the input entry points, and the destruction and
//! child-exit notifications.

pub mod bindings;
pub mod config;
pub mod fullscreen;
pub mod grabs;
pub mod helper;
pub mod lock;
pub mod surface;

#[cfg(test)]
mod tests;

pub use config::ShellConfig;
pub use surface::{FullscreenMethod, Role, ShellSurface, ShellSurfaceId};

use std::collections::HashMap;

use rand::distributions::{Distribution, Uniform};

use crate::core::compositor::{Compositor, ZoomAnimation};
use crate::core::events::ShellEvent;
use crate::core::input::{ButtonState, KeyState, KeyboardGrab, Modifiers, PointerGrab};
use crate::core::layer::LayerKind;
use crate::core::output::OutputId;
use crate::core::surface::SurfaceId;
use crate::shell::bindings::Binding;
use crate::shell::helper::HelperState;
use crate::shell::lock::ScreensaverState;

pub struct Shell {
    pub comp: Compositor,
    pub config: ShellConfig,
    pub(crate) surfaces: HashMap<ShellSurfaceId, ShellSurface>,
    pub(crate) by_surface: HashMap<SurfaceId, ShellSurfaceId>,
    pub(crate) next_shell_surface_id: u32,
    pub(crate) backgrounds: Vec<ShellSurfaceId>,
    pub(crate) panels: Vec<ShellSurfaceId>,
    pub locked: bool,
    pub(crate) prepare_event_sent: bool,
    pub lock_surface: Option<ShellSurfaceId>,
    pub(crate) helper: HelperState,
    pub(crate) screensaver: ScreensaverState,
    pub(crate) debug_surface: Option<SurfaceId>,
    pub(crate) bindings: Vec<Binding>,
}

impl Shell {
    pub fn new(comp: Compositor, config: ShellConfig) -> Self {
        let helper = HelperState::new(comp.now());
        let screensaver = ScreensaverState::new(&config);
        let mut shell = Self {
            comp,
            config,
            surfaces: HashMap::new(),
            by_surface: HashMap::new(),
            next_shell_surface_id: 0,
            backgrounds: Vec::new(),
            panels: Vec::new(),
            locked: false,
            prepare_event_sent: false,
            lock_surface: None,
            helper,
            screensaver,
            debug_surface: None,
            bindings: Vec::new(),
        };
        bindings::install_default_bindings(&mut shell);
        shell
    }

    /// Launches the helper client. Split from `new` so hosts control when
    /// the privileged child appears.
    pub fn start(&mut self) {
        self.launch_helper();
    }

    /// Compositor teardown: drops the helper connection.
    pub fn shutdown(&mut self) {
        if self.helper.client.take().is_some() {
            tracing::info!("dropping helper client");
        }
        self.helper.binding = None;
    }

    // -- hooks ---------------------------------------------------------------

    /// Initial placement and stacking when a surface first gets content.
    pub fn map(&mut self, sid: SurfaceId, width: i32, height: i32, sx: f64, sy: f64) {
        let ssid = self.shell_surface_for(sid);
        let role = ssid
            .and_then(|id| self.surfaces.get(&id))
            .map(|ss| ss.role)
            .unwrap_or(Role::None);

        let old_pos = match self.comp.surface_mut(sid) {
            Some(s) => {
                s.width = width;
                s.height = height;
                s.geometry_dirty = true;
                s.update_transform();
                (s.x, s.y)
            }
            None => return,
        };

        // initial positioning, see also configure()
        match role {
            Role::Toplevel => {
                let range = Uniform::new(10, 410);
                let mut rng = rand::thread_rng();
                let x = range.sample(&mut rng) as f64;
                let y = range.sample(&mut rng) as f64;
                self.comp.set_position(sid, x, y);
            }
            Role::Screensaver => {
                let output = ssid
                    .and_then(|id| self.surfaces.get(&id))
                    .and_then(|ss| ss.fullscreen_output);
                if let Some(output) = output {
                    self.center_on_output(sid, output);
                }
            }
            Role::Fullscreen => {
                if let Some(ssid) = ssid {
                    self.map_fullscreen(ssid);
                }
            }
            Role::Maximized => {
                // geometry comes from the configure event; pin the origin
                let output = ssid
                    .and_then(|id| self.surfaces.get(&id))
                    .and_then(|ss| ss.output);
                if let Some(output) = output {
                    let panel_height = self.output_panel_height(output);
                    if let Some(out) = self.comp.output(output) {
                        let (ox, oy) = (out.x as f64, out.y as f64);
                        self.comp.set_position(sid, ox, oy + panel_height as f64);
                    }
                }
            }
            Role::Lock => {
                if let Some(output) = self.comp.default_output().map(|o| o.id) {
                    self.center_on_output(sid, output);
                }
            }
            Role::Popup => {
                if let Some(ssid) = ssid {
                    self.map_popup(ssid);
                }
                // popups also take the relative offset, like role-less
                // surfaces
                if let Some(s) = self.comp.surface(sid) {
                    let (x, y) = (s.x, s.y);
                    self.comp.set_position(sid, x + sx, y + sy);
                }
            }
            Role::None => {
                self.comp.set_position(sid, old_pos.0 + sx, old_pos.1 + sy);
            }
            Role::Transient | Role::Panel | Role::Background => {}
        }

        // surface stacking order, see also activate()
        match role {
            Role::Background => {
                self.comp
                    .layers
                    .layer_mut(LayerKind::Background)
                    .push_bottom(sid);
            }
            Role::Panel => {
                self.comp.layers.layer_mut(LayerKind::Panel).push_top(sid);
            }
            Role::Lock => {
                self.comp.layers.layer_mut(LayerKind::Lock).push_top(sid);
                self.comp.wake();
            }
            Role::Screensaver => {
                if self.locked {
                    if let Some(ssid) = ssid {
                        self.show_screensaver(ssid);
                    }
                    self.comp.idle_time = self.screensaver.duration;
                    self.comp.wake();
                    if self.lock_surface.is_none() {
                        self.comp.phase = crate::core::CompositorPhase::Idle;
                    }
                }
            }
            Role::Popup | Role::Transient => {
                let parent_sid = ssid
                    .and_then(|id| self.surfaces.get(&id))
                    .and_then(|ss| ss.parent)
                    .and_then(|p| self.surfaces.get(&p))
                    .map(|p| p.surface);
                if let Some(parent_sid) = parent_sid {
                    if let Some(kind) = self.comp.layers.layer_of(parent_sid) {
                        self.comp.layers.layer_mut(kind).insert_below(parent_sid, sid);
                    }
                }
            }
            Role::Fullscreen | Role::None => {}
            Role::Toplevel | Role::Maximized => {
                self.comp.layers.layer_mut(LayerKind::Toplevel).push_top(sid);
            }
        }

        self.comp.assign_output(sid);
        self.repick();
        if role == Role::Maximized {
            let output = ssid.and_then(|id| self.surfaces.get(&id)).and_then(|ss| ss.output);
            if let Some(s) = self.comp.surface_mut(sid) {
                s.output = output;
            }
        }

        match role {
            Role::Toplevel | Role::Transient | Role::Fullscreen | Role::Maximized => {
                if !self.locked {
                    let time = self.comp.now();
                    self.activate(sid, time);
                }
            }
            _ => {}
        }

        if role == Role::Toplevel {
            self.comp.animations.push(ZoomAnimation {
                surface: sid,
                from: 0.8,
                to: 1.0,
            });
        }
    }

    /// The client committed new geometry.
    pub fn configure(&mut self, sid: SurfaceId, x: f64, y: f64, width: i32, height: i32) {
        let ssid = self.shell_surface_for(sid);
        let role = ssid
            .and_then(|id| self.surfaces.get(&id))
            .map(|ss| ss.role)
            .unwrap_or(Role::None);

        match self.comp.surface_mut(sid) {
            Some(s) => {
                s.x = x;
                s.y = y;
                s.width = width;
                s.height = height;
                s.geometry_dirty = true;
                s.update_transform();
            }
            None => return,
        }

        match role {
            Role::Screensaver => {
                let output = ssid
                    .and_then(|id| self.surfaces.get(&id))
                    .and_then(|ss| ss.fullscreen_output);
                if let Some(output) = output {
                    self.center_on_output(sid, output);
                }
            }
            Role::Fullscreen => {
                if let Some(ssid) = ssid {
                    self.configure_fullscreen(ssid);
                    self.stack_fullscreen(ssid);
                }
            }
            Role::Maximized => {
                let output = ssid
                    .and_then(|id| self.surfaces.get(&id))
                    .and_then(|ss| ss.output);
                if let Some(output) = output {
                    let panel_height = self.output_panel_height(output);
                    if let Some(out) = self.comp.output(output) {
                        let (ox, oy) = (out.x as f64, out.y as f64);
                        self.comp.set_position(sid, ox, oy + panel_height as f64);
                    }
                }
            }
            _ => {}
        }

        if self.comp.surface(sid).map(|s| s.output.is_some()) == Some(true) {
            self.comp.assign_output(sid);
            self.repick();
            if matches!(role, Role::Screensaver | Role::Maximized) {
                let pinned = ssid.and_then(|id| self.surfaces.get(&id)).and_then(|ss| ss.output);
                if let Some(s) = self.comp.surface_mut(sid) {
                    s.output = pinned;
                }
            }
        }
    }

    /// The compositor surface died; tear down everything hanging off it.
    pub fn handle_surface_destroy(&mut self, sid: SurfaceId) {
        if let Some(ssid) = self.shell_surface_for(sid) {
            self.release_shell_surface(ssid);
        }
        self.comp.destroy_surface(sid);
        if self.debug_surface == Some(sid) {
            self.debug_surface = None;
        }
        self.with_keyboard_grab(|shell, grab| grab.surface_gone(shell, sid));
    }

    // -- activation ----------------------------------------------------------

    /// Gives a surface the keyboard focus and restacks it by role.
    pub fn activate(&mut self, sid: SurfaceId, _time: u32) {
        self.comp.input.keyboard_focus = Some(sid);
        if self.comp.x_bridge {
            self.comp
                .pending_events
                .push(ShellEvent::BridgeActivated { surface: sid });
        }

        match self.role_of(sid) {
            Role::Background | Role::Panel | Role::Lock => {}
            Role::Screensaver => {
                // always below the lock surface
                let lock_sid = self
                    .lock_surface
                    .and_then(|id| self.surfaces.get(&id))
                    .map(|ss| ss.surface);
                if let Some(lock_sid) = lock_sid {
                    self.comp.layers.remove_surface(sid);
                    if let Some(kind) = self.comp.layers.layer_of(lock_sid) {
                        self.comp.layers.layer_mut(kind).insert_below(lock_sid, sid);
                    }
                }
            }
            // already on top of the panels
            Role::Fullscreen => {}
            _ => {
                self.comp.layers.remove_surface(sid);
                self.comp.layers.layer_mut(LayerKind::Toplevel).push_top(sid);
            }
        }
    }

    // -- input entry points --------------------------------------------------

    pub fn pointer_motion(&mut self, time: u32, x: f64, y: f64) {
        self.comp.input.x = x;
        self.comp.input.y = y;
        let picked = self.comp.pick(x, y);
        let had_grab = self.with_pointer_grab(|shell, grab| {
            let (sx, sy) = match picked {
                Some(p) => shell.comp.surface_from_global(p, x, y),
                None => (0.0, 0.0),
            };
            grab.focus(shell, time, picked, sx, sy);
            grab.motion(shell, time, x, y);
        });
        if !had_grab {
            self.comp.input.pointer_focus = picked;
        }
    }

    pub fn pointer_button(&mut self, time: u32, button: u32, state: ButtonState) {
        {
            let input = &mut self.comp.input;
            match state {
                ButtonState::Pressed => {
                    if input.button_count == 0 {
                        input.grab_time = time;
                        input.grab_x = input.x;
                        input.grab_y = input.y;
                        input.grab_button = button;
                    }
                    input.button_count += 1;
                }
                ButtonState::Released => {
                    input.button_count = input.button_count.saturating_sub(1);
                }
            }
        }
        if state == ButtonState::Pressed && !self.comp.input.has_pointer_grab() {
            self.run_button_bindings(time, button);
        }
        self.with_pointer_grab(|shell, grab| grab.button(shell, time, button, state));
    }

    /// Key events. Modifier state must be updated through
    /// [`Shell::set_modifiers`] before the corresponding key event arrives.
    pub fn keyboard_key(&mut self, time: u32, key: u32, state: KeyState) {
        if state == KeyState::Pressed && !self.comp.input.has_keyboard_grab() {
            self.run_key_bindings(time, key);
        }
        self.with_keyboard_grab(|shell, grab| grab.key(shell, time, key, state));
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.comp.input.modifiers = modifiers;
    }

    /// Recomputes the pointer focus from the current stacking order.
    pub fn repick(&mut self) {
        let (x, y) = (self.comp.input.x, self.comp.input.y);
        let picked = self.comp.pick(x, y);
        let had_grab = self.with_pointer_grab(|shell, grab| {
            let time = shell.comp.now();
            let (sx, sy) = match picked {
                Some(p) => shell.comp.surface_from_global(p, x, y),
                None => (0.0, 0.0),
            };
            grab.focus(shell, time, picked, sx, sy);
        });
        if !had_grab {
            self.comp.input.pointer_focus = picked;
        }
    }

    // -- grab plumbing -------------------------------------------------------

    pub(crate) fn start_pointer_grab(&mut self, grab: Box<dyn PointerGrab>, _time: u32) {
        self.comp.input.pointer_grab = Some(grab);
        self.comp.input.pointer_grab_ending = false;
    }

    /// Ends the active pointer grab. Safe to call both from inside a grab
    /// callback and from teardown paths.
    pub(crate) fn end_pointer_grab(&mut self, _time: u32) {
        if self.comp.input.pointer_grab.is_some() {
            self.comp.input.pointer_grab = None;
            let (x, y) = (self.comp.input.x, self.comp.input.y);
            self.comp.input.pointer_focus = self.comp.pick(x, y);
        } else {
            self.comp.input.pointer_grab_ending = true;
        }
    }

    pub(crate) fn start_keyboard_grab(&mut self, grab: Box<dyn KeyboardGrab>, _time: u32) {
        self.comp.input.keyboard_grab = Some(grab);
        self.comp.input.keyboard_grab_ending = false;
    }

    pub(crate) fn end_keyboard_grab(&mut self, _time: u32) {
        if self.comp.input.keyboard_grab.is_some() {
            self.comp.input.keyboard_grab = None;
        } else {
            self.comp.input.keyboard_grab_ending = true;
        }
    }

    /// Runs `f` against the installed pointer grab, honouring an end
    /// request made during the callback. Returns false when no grab was
    /// installed.
    fn with_pointer_grab(&mut self, f: impl FnOnce(&mut Shell, &mut dyn PointerGrab)) -> bool {
        let Some(mut grab) = self.comp.input.pointer_grab.take() else {
            return false;
        };
        self.comp.input.pointer_grab_ending = false;
        f(self, grab.as_mut());
        if self.comp.input.pointer_grab_ending {
            self.comp.input.pointer_grab_ending = false;
            let (x, y) = (self.comp.input.x, self.comp.input.y);
            self.comp.input.pointer_focus = self.comp.pick(x, y);
        } else if self.comp.input.pointer_grab.is_none() {
            self.comp.input.pointer_grab = Some(grab);
        }
        true
    }

    fn with_keyboard_grab(&mut self, f: impl FnOnce(&mut Shell, &mut dyn KeyboardGrab)) -> bool {
        let Some(mut grab) = self.comp.input.keyboard_grab.take() else {
            return false;
        };
        self.comp.input.keyboard_grab_ending = false;
        f(self, grab.as_mut());
        if self.comp.input.keyboard_grab_ending {
            self.comp.input.keyboard_grab_ending = false;
        } else if self.comp.input.keyboard_grab.is_none() {
            self.comp.input.keyboard_grab = Some(grab);
        }
        true
    }

    // -- shared helpers ------------------------------------------------------

    /// Height of the panel bound to `output`, or 0.
    pub(crate) fn output_panel_height(&self, output: OutputId) -> i32 {
        for &ssid in &self.panels {
            if let Some(ss) = self.surfaces.get(&ssid) {
                if ss.output == Some(output) {
                    if let Some(s) = self.comp.surface(ss.surface) {
                        return s.height;
                    }
                }
            }
        }
        0
    }
}
