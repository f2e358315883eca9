//! Helper process supervision and the privileged protocol gates.
//!
//! The helper draws the panel, background, and lock dialog. It is spawned
//! at startup and respawned on crash, bounded by a leaky-bucket counter:
//! more than `MAX_DEATHS` exits inside `DEATH_WINDOW_MS` and the shell
//! gives up, leaving the desktop functional but bare.

use crate::core::compositor::ClientId;
use crate::core::errors::{Result, ShellError};
use crate::core::events::ShellEvent;
use crate::core::input::ResizeEdges;
use crate::core::output::OutputId;
use crate::shell::surface::Role;
use crate::shell::{Shell, ShellSurfaceId};

const DEATH_WINDOW_MS: u32 = 30_000;
const MAX_DEATHS: u32 = 5;

#[derive(Debug)]
pub(crate) struct HelperState {
    pub client: Option<ClientId>,
    /// Set while the helper holds its privileged protocol binding.
    pub binding: Option<ClientId>,
    pub pid: Option<u32>,
    pub death_count: u32,
    /// Timestamp of the first death in the current window.
    pub death_stamp: u32,
    pub gave_up: bool,
}

impl HelperState {
    pub fn new(now: u32) -> Self {
        Self {
            client: None,
            binding: None,
            pid: None,
            death_count: 0,
            death_stamp: now,
            gave_up: false,
        }
    }
}

impl Shell {
    /// The privileged helper's client handle, once launched.
    pub fn helper_client(&self) -> Option<ClientId> {
        self.helper.client
    }

    pub(crate) fn launch_helper(&mut self) {
        let path = self.config.helper_path.clone();
        match self.comp.launch_client(&path) {
            Ok((client, pid)) => {
                self.helper.client = Some(client);
                self.helper.pid = Some(pid);
            }
            Err(err) => tracing::warn!("helper launch failed: {err:#}"),
        }
    }

    /// Host notification that a shell-owned child exited.
    pub fn handle_child_exit(&mut self, pid: u32, status: i32) {
        self.comp.launcher.reaped(pid);

        if self.helper.pid == Some(pid) {
            self.helper.pid = None;
            // the connection died with the process
            self.unbind_desktop_shell();
            self.helper.client = None;

            let now = self.comp.now();
            if now.wrapping_sub(self.helper.death_stamp) > DEATH_WINDOW_MS {
                self.helper.death_stamp = now;
                self.helper.death_count = 0;
            }
            self.helper.death_count += 1;
            if self.helper.death_count > MAX_DEATHS {
                tracing::error!("helper died {} times (status {}), giving up", self.helper.death_count, status);
                self.helper.gave_up = true;
                return;
            }
            tracing::warn!("helper died (status {}), respawning", status);
            self.launch_helper();
        } else if self.screensaver.pid == Some(pid) {
            self.screensaver.pid = None;
        }
    }

    // -- privileged binding gates --------------------------------------------

    /// A client bound the privileged desktop-shell protocol. Only the
    /// helper is allowed to.
    pub fn bind_desktop_shell(&mut self, client: ClientId) -> Result<()> {
        if self.helper.client == Some(client) {
            self.helper.binding = Some(client);
            return Ok(());
        }
        self.comp.pending_events.push(ShellEvent::ProtocolError {
            client,
            message: "permission to bind desktop_shell denied",
        });
        Err(ShellError::BindDenied)
    }

    /// The helper's binding went away (disconnect or exit). A locked
    /// desktop must resume rather than stay wedged.
    pub fn unbind_desktop_shell(&mut self) {
        if self.locked {
            self.resume_desktop();
        }
        self.helper.binding = None;
        self.prepare_event_sent = false;
    }

    /// A client bound the screensaver protocol; only one may at a time.
    pub fn bind_screensaver(&mut self, client: ClientId) -> Result<()> {
        if self.screensaver.binding.is_none() {
            self.screensaver.binding = Some(client);
            return Ok(());
        }
        self.comp.pending_events.push(ShellEvent::ProtocolError {
            client,
            message: "interface object already bound",
        });
        Err(ShellError::AlreadyBound)
    }

    pub fn unbind_screensaver(&mut self) {
        self.screensaver.binding = None;
    }

    // -- privileged requests -------------------------------------------------

    /// Helper request: use `ssid` as the wallpaper for `output`, evicting
    /// any previous one.
    pub fn set_background(
        &mut self,
        client: ClientId,
        output: OutputId,
        ssid: ShellSurfaceId,
    ) -> Result<()> {
        self.set_helper_surface(client, output, ssid, Role::Background)
    }

    /// Helper request: use `ssid` as the panel for `output`, evicting any
    /// previous one.
    pub fn set_panel(
        &mut self,
        client: ClientId,
        output: OutputId,
        ssid: ShellSurfaceId,
    ) -> Result<()> {
        self.set_helper_surface(client, output, ssid, Role::Panel)
    }

    fn set_helper_surface(
        &mut self,
        client: ClientId,
        output: OutputId,
        ssid: ShellSurfaceId,
        role: Role,
    ) -> Result<()> {
        self.reset_surface_role(ssid)?;

        // one surface per output; unbind the previous occupant entirely
        let list = match role {
            Role::Background => &self.backgrounds,
            _ => &self.panels,
        };
        let evicted = list
            .iter()
            .copied()
            .find(|id| self.surfaces.get(id).map(|ss| ss.output) == Some(Some(output)));
        if let Some(old) = evicted {
            let old_sid = self.surfaces.get(&old).map(|ss| ss.surface);
            if let Some(old_sid) = old_sid {
                self.comp.layers.remove_surface(old_sid);
                if let Some(s) = self.comp.surface_mut(old_sid) {
                    s.output = None;
                }
            }
            self.backgrounds.retain(|&id| id != old);
            self.panels.retain(|&id| id != old);
        }

        let sid = match self.surfaces.get_mut(&ssid) {
            Some(ss) => {
                ss.role = role;
                ss.output = Some(output);
                ss.surface
            }
            None => return Err(ShellError::UnknownSurface),
        };
        match role {
            Role::Background => self.backgrounds.push(ssid),
            _ => self.panels.push(ssid),
        }

        let Some(out) = self.comp.output(output) else {
            return Ok(());
        };
        let (ox, oy) = (out.x as f64, out.y as f64);
        let mode = out.current;
        self.comp.set_position(sid, ox, oy);
        let time = self.comp.now();
        self.comp.pending_events.push(ShellEvent::HelperConfigure {
            client,
            surface: sid,
            time,
            edges: ResizeEdges::empty(),
            width: mode.width as i32,
            height: mode.height as i32,
        });
        Ok(())
    }
}
