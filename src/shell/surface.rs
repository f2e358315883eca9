//! Shell-surface records and the role state machine.
//!
//! Every client surface that asked for shell treatment gets one
//! [`ShellSurface`] record in the shell's arena. The record carries the
//! role tag plus the role-specific sub-state that must survive between
//! hook invocations (saved geometry, rotation, popup anchors, the
//! fullscreen backdrop).

use crate::core::compositor::ClientId;
use crate::core::errors::{Result, ShellError};
use crate::core::events::ShellEvent;
use crate::core::input::ResizeEdges;
use crate::core::output::OutputId;
use crate::core::surface::{SurfaceId, TransformTag};
use crate::shell::Shell;
use crate::util::matrix::Matrix;

/// Stable handle into the shell's role table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShellSurfaceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    None,
    Toplevel,
    Transient,
    Popup,
    Fullscreen,
    Maximized,
    Panel,
    Background,
    Lock,
    Screensaver,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::None => "none",
            Role::Toplevel => "toplevel",
            Role::Transient => "transient",
            Role::Popup => "popup",
            Role::Fullscreen => "fullscreen",
            Role::Maximized => "maximized",
            Role::Panel => "panel",
            Role::Background => "background",
            Role::Lock => "lock",
            Role::Screensaver => "screensaver",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenMethod {
    Default,
    Scale,
    Driver,
    Fill,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PopupState {
    /// Requested position relative to the parent.
    pub x: f64,
    pub y: f64,
    /// Implicit-grab time captured when the popup mapped.
    pub time: u32,
    /// Set once the press that opened the popup has been released.
    pub initial_up: bool,
    /// True while the popup's pointer grab is installed.
    pub active: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FullscreenState {
    pub method: FullscreenMethod,
    pub framerate: u32,
    pub black_surface: Option<SurfaceId>,
}

impl Default for FullscreenState {
    fn default() -> Self {
        Self {
            method: FullscreenMethod::Default,
            framerate: 0,
            black_surface: None,
        }
    }
}

#[derive(Debug)]
pub struct ShellSurface {
    pub id: ShellSurfaceId,
    pub surface: SurfaceId,
    pub client: ClientId,
    pub parent: Option<ShellSurfaceId>,
    pub role: Role,
    /// Captured on entry to fullscreen/maximized, restored on exit.
    pub saved_position: Option<(f64, f64)>,
    /// Committed rotation, folded in when a rotate grab releases.
    pub rotation: Matrix,
    pub popup: PopupState,
    pub fullscreen: FullscreenState,
    pub output: Option<OutputId>,
    pub fullscreen_output: Option<OutputId>,
}

impl ShellSurface {
    pub fn new(id: ShellSurfaceId, surface: SurfaceId, client: ClientId) -> Self {
        Self {
            id,
            surface,
            client,
            parent: None,
            role: Role::None,
            saved_position: None,
            rotation: Matrix::IDENTITY,
            popup: PopupState::default(),
            fullscreen: FullscreenState::default(),
            output: None,
            fullscreen_output: None,
        }
    }
}

impl Shell {
    /// Handles `get_shell_surface`: attaches a role record to a surface.
    pub fn get_shell_surface(&mut self, client: ClientId, sid: SurfaceId) -> Result<ShellSurfaceId> {
        if self.by_surface.contains_key(&sid) {
            self.comp.pending_events.push(ShellEvent::ProtocolError {
                client,
                message: "get_shell_surface already requested",
            });
            return Err(ShellError::AlreadyRequested);
        }
        if self.comp.surface(sid).is_none() {
            return Err(ShellError::UnknownSurface);
        }
        self.next_shell_surface_id += 1;
        let id = ShellSurfaceId(self.next_shell_surface_id);
        self.surfaces.insert(id, ShellSurface::new(id, sid, client));
        self.by_surface.insert(sid, id);
        tracing::debug!("shell surface {:?} attached to {:?}", id, sid);
        Ok(id)
    }

    pub fn shell_surface(&self, id: ShellSurfaceId) -> Option<&ShellSurface> {
        self.surfaces.get(&id)
    }

    pub fn shell_surface_mut(&mut self, id: ShellSurfaceId) -> Option<&mut ShellSurface> {
        self.surfaces.get_mut(&id)
    }

    pub fn shell_surface_for(&self, sid: SurfaceId) -> Option<ShellSurfaceId> {
        self.by_surface.get(&sid).copied()
    }

    pub fn role_of(&self, sid: SurfaceId) -> Role {
        self.shell_surface_for(sid)
            .and_then(|id| self.surfaces.get(&id))
            .map(|ss| ss.role)
            .unwrap_or(Role::None)
    }

    /// Undoes the current role's side effects and clears the role. Fails
    /// for the two roles that may never be reassigned.
    pub(crate) fn reset_surface_role(&mut self, ssid: ShellSurfaceId) -> Result<()> {
        let Some(ss) = self.surfaces.get(&ssid) else {
            return Err(ShellError::UnknownSurface);
        };
        let (role, sid, client) = (ss.role, ss.surface, ss.client);
        match role {
            Role::Fullscreen => {
                let saved = ss.saved_position;
                let black = ss.fullscreen.black_surface;
                if let Some(s) = self.comp.surface_mut(sid) {
                    s.remove_transform(TransformTag::FullscreenScale);
                    s.force_configure = true;
                }
                if let Some(black) = black {
                    self.comp.destroy_surface(black);
                }
                if let Some(ss) = self.surfaces.get_mut(&ssid) {
                    ss.fullscreen = FullscreenState::default();
                    ss.fullscreen_output = None;
                }
                if let Some((x, y)) = saved {
                    self.comp.set_position(sid, x, y);
                }
            }
            Role::Maximized => {
                let saved = ss.saved_position;
                let default_output = self.comp.default_output().map(|o| o.id);
                if let Some(ss) = self.surfaces.get_mut(&ssid) {
                    ss.output = default_output;
                }
                if let Some((x, y)) = saved {
                    self.comp.set_position(sid, x, y);
                }
            }
            Role::Panel | Role::Background => {
                self.panels.retain(|&s| s != ssid);
                self.backgrounds.retain(|&s| s != ssid);
            }
            Role::Lock | Role::Screensaver => {
                self.comp.pending_events.push(ShellEvent::ProtocolError {
                    client,
                    message: "cannot reassign surface type",
                });
                return Err(ShellError::RoleLocked);
            }
            Role::None | Role::Toplevel | Role::Transient | Role::Popup => {}
        }
        if let Some(ss) = self.surfaces.get_mut(&ssid) {
            ss.role = Role::None;
        }
        Ok(())
    }

    pub fn set_toplevel(&mut self, ssid: ShellSurfaceId) -> Result<()> {
        self.reset_surface_role(ssid)?;
        if let Some(ss) = self.surfaces.get_mut(&ssid) {
            ss.role = Role::Toplevel;
        }
        Ok(())
    }

    pub fn set_transient(
        &mut self,
        ssid: ShellSurfaceId,
        parent: ShellSurfaceId,
        x: f64,
        y: f64,
        _flags: u32,
    ) -> Result<()> {
        self.reset_surface_role(ssid)?;
        let Some(parent_ss) = self.surfaces.get(&parent) else {
            return Err(ShellError::UnknownSurface);
        };
        let parent_sid = parent_ss.surface;
        let (parent_output, px, py) = match self.comp.surface(parent_sid) {
            Some(p) => (p.output, p.x, p.y),
            None => (None, 0.0, 0.0),
        };
        let sid = match self.surfaces.get_mut(&ssid) {
            Some(ss) => {
                ss.parent = Some(parent);
                ss.role = Role::Transient;
                ss.surface
            }
            None => return Err(ShellError::UnknownSurface),
        };
        if let Some(s) = self.comp.surface_mut(sid) {
            s.output = parent_output;
        }
        self.comp.set_position(sid, px + x, py + y);
        Ok(())
    }

    pub fn set_fullscreen(
        &mut self,
        ssid: ShellSurfaceId,
        method: FullscreenMethod,
        framerate: u32,
        output: Option<OutputId>,
    ) -> Result<()> {
        let target = output.or_else(|| self.comp.default_output().map(|o| o.id));
        if let Some(ss) = self.surfaces.get_mut(&ssid) {
            ss.output = target;
        }
        self.reset_surface_role(ssid)?;

        let Some(ss) = self.surfaces.get(&ssid) else {
            return Err(ShellError::UnknownSurface);
        };
        let sid = ss.surface;
        let (pos, on_output) = match self.comp.surface(sid) {
            Some(s) => ((s.x, s.y), s.output.is_some()),
            None => ((0.0, 0.0), false),
        };
        if let Some(ss) = self.surfaces.get_mut(&ssid) {
            ss.fullscreen_output = target;
            ss.fullscreen.method = method;
            ss.fullscreen.framerate = framerate;
            ss.role = Role::Fullscreen;
            ss.saved_position = Some(pos);
        }
        if on_output {
            if let Some(s) = self.comp.surface_mut(sid) {
                s.force_configure = true;
            }
        }
        if let Some(mode) = target.and_then(|o| self.comp.output(o)).map(|o| o.current) {
            let time = self.comp.now();
            self.comp.pending_events.push(ShellEvent::Configure {
                surface: sid,
                time,
                edges: ResizeEdges::empty(),
                width: mode.width as i32,
                height: mode.height as i32,
            });
        }
        Ok(())
    }

    pub fn set_popup(
        &mut self,
        ssid: ShellSurfaceId,
        _time: u32,
        parent: ShellSurfaceId,
        x: f64,
        y: f64,
        _flags: u32,
    ) -> Result<()> {
        self.reset_surface_role(ssid)?;
        if let Some(ss) = self.surfaces.get_mut(&ssid) {
            ss.role = Role::Popup;
            ss.parent = Some(parent);
            ss.popup.x = x;
            ss.popup.y = y;
        }
        Ok(())
    }

    pub fn set_maximized(&mut self, ssid: ShellSurfaceId, output: Option<OutputId>) -> Result<()> {
        let target = output.or_else(|| self.comp.default_output().map(|o| o.id));
        if let Some(ss) = self.surfaces.get_mut(&ssid) {
            ss.output = target;
        }
        self.reset_surface_role(ssid)?;

        let Some(ss) = self.surfaces.get(&ssid) else {
            return Err(ShellError::UnknownSurface);
        };
        let sid = ss.surface;
        let pos = match self.comp.surface(sid) {
            Some(s) => (s.x, s.y),
            None => (0.0, 0.0),
        };
        if let Some(ss) = self.surfaces.get_mut(&ssid) {
            ss.saved_position = Some(pos);
        }
        if let Some(target) = target {
            let panel_height = self.output_panel_height(target);
            if let Some(mode) = self.comp.output(target).map(|o| o.current) {
                let time = self.comp.now();
                self.comp.pending_events.push(ShellEvent::Configure {
                    surface: sid,
                    time,
                    edges: ResizeEdges::TOP | ResizeEdges::LEFT,
                    width: mode.width as i32,
                    height: mode.height as i32 - panel_height,
                });
            }
        }
        if let Some(ss) = self.surfaces.get_mut(&ssid) {
            ss.role = Role::Maximized;
        }
        Ok(())
    }

    /// Client `move` request. Stale or mis-focused requests are ignored.
    pub fn surface_move(&mut self, ssid: ShellSurfaceId, time: u32) -> Result<()> {
        let Some(ss) = self.surfaces.get(&ssid) else {
            return Err(ShellError::UnknownSurface);
        };
        let sid = ss.surface;
        let input = &self.comp.input;
        if input.button_count == 0
            || input.grab_time != time
            || input.pointer_focus != Some(sid)
        {
            return Ok(());
        }
        self.begin_move(sid, time);
        Ok(())
    }

    /// Client `resize` request. Stale requests and bad edge masks are
    /// ignored; fullscreen surfaces cannot be resized.
    pub fn surface_resize(&mut self, ssid: ShellSurfaceId, time: u32, edges: u32) -> Result<()> {
        let Some(ss) = self.surfaces.get(&ssid) else {
            return Err(ShellError::UnknownSurface);
        };
        if ss.role == Role::Fullscreen {
            return Ok(());
        }
        let sid = ss.surface;
        let input = &self.comp.input;
        if input.button_count == 0
            || input.grab_time != time
            || input.pointer_focus != Some(sid)
        {
            return Ok(());
        }
        let Some(edges) = ResizeEdges::from_bits(edges) else {
            return Ok(());
        };
        self.begin_resize(ssid, time, edges);
        Ok(())
    }

    /// Drops the role record when the client releases it. The compositor
    /// surface itself stays alive.
    pub fn release_shell_surface(&mut self, ssid: ShellSurfaceId) {
        let Some(ss) = self.surfaces.remove(&ssid) else {
            return;
        };
        self.by_surface.remove(&ss.surface);
        if ss.popup.active {
            self.comp.input.pointer_grab = None;
            self.comp.input.pointer_grab_ending = false;
        }
        if let Some(black) = ss.fullscreen.black_surface {
            self.comp.destroy_surface(black);
        }
        self.backgrounds.retain(|&s| s != ssid);
        self.panels.retain(|&s| s != ssid);
        self.screensaver.surfaces.retain(|&s| s != ssid);
        if self.lock_surface == Some(ssid) {
            tracing::warn!("lock surface gone");
            self.lock_surface = None;
        }
    }
}
