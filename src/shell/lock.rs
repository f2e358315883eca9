//! Lock orchestration and the screensaver.
//!
//! Locking hides the desktop by splicing the fullscreen/panel/toplevel
//! layers out of the global order and the lock layer in. Unlocking is a
//! handshake with the helper: the shell asks for a lock surface once, and
//! the desktop resumes only when the helper says so (or is gone).

use crate::core::compositor::{ClientId, CompositorPhase};
use crate::core::errors::{Result, ShellError};
use crate::core::events::ShellEvent;
use crate::core::layer::LayerKind;
use crate::core::output::{DpmsLevel, OutputId};
use crate::shell::config::ShellConfig;
use crate::shell::surface::Role;
use crate::shell::{Shell, ShellSurfaceId};

#[derive(Debug)]
pub(crate) struct ScreensaverState {
    pub path: Option<String>,
    /// Idle timeout while the saver is up, in seconds.
    pub duration: u32,
    /// Client currently holding the screensaver protocol, if any.
    pub binding: Option<ClientId>,
    pub surfaces: Vec<ShellSurfaceId>,
    pub pid: Option<u32>,
}

impl ScreensaverState {
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            path: config.screensaver_path.clone(),
            duration: config.screensaver_duration,
            binding: None,
            surfaces: Vec::new(),
            pid: None,
        }
    }
}

impl Shell {
    /// Compositor hook: the session went idle (or the user asked to lock).
    pub fn lock(&mut self) {
        if self.locked {
            for out in &mut self.comp.outputs {
                out.set_dpms(DpmsLevel::Standby);
            }
            return;
        }

        self.locked = true;
        tracing::info!("locking desktop");

        // Hide everything by removing the fullscreen, panel and toplevel
        // layers. Nothing else can show or take input while locked.
        self.comp.layers.splice_out(LayerKind::Fullscreen);
        self.comp.layers.splice_out(LayerKind::Panel);
        self.comp.layers.splice_out(LayerKind::Toplevel);
        self.comp
            .layers
            .splice_in_below(LayerKind::Lock, LayerKind::Cursor);

        self.launch_screensaver();
        for ssid in self.screensaver.surfaces.clone() {
            self.show_screensaver(ssid);
        }
        if !self.screensaver.surfaces.is_empty() {
            self.comp.idle_time = self.screensaver.duration;
            self.comp.wake();
            self.comp.phase = CompositorPhase::Idle;
        }

        self.repick();
        self.comp.input.keyboard_focus = None;
    }

    /// Compositor hook: user activity while locked.
    pub fn unlock(&mut self) {
        if !self.locked || self.lock_surface.is_some() {
            self.comp.wake();
            return;
        }

        match self.helper.binding {
            // helper has gone away, unlock immediately
            None => self.resume_desktop(),
            Some(client) => {
                if !self.prepare_event_sent {
                    self.comp
                        .pending_events
                        .push(ShellEvent::PrepareLockSurface { client });
                    self.prepare_event_sent = true;
                }
            }
        }
    }

    /// Helper request: use `ssid` as the lock dialog.
    pub fn set_lock_surface(&mut self, ssid: ShellSurfaceId) -> Result<()> {
        self.reset_surface_role(ssid)?;
        self.prepare_event_sent = false;

        if !self.locked {
            return Ok(());
        }
        self.lock_surface = Some(ssid);
        if let Some(ss) = self.surfaces.get_mut(&ssid) {
            ss.role = Role::Lock;
        }
        Ok(())
    }

    /// Helper request: the user authenticated, bring the desktop back.
    pub fn helper_unlock(&mut self) {
        self.prepare_event_sent = false;
        if self.locked {
            self.resume_desktop();
        }
    }

    pub(crate) fn resume_desktop(&mut self) {
        for ssid in self.screensaver.surfaces.clone() {
            self.hide_screensaver(ssid);
        }
        self.terminate_screensaver();

        self.comp.layers.splice_out(LayerKind::Lock);
        self.comp
            .layers
            .splice_in_below(LayerKind::Fullscreen, LayerKind::Cursor);
        self.comp
            .layers
            .splice_in_below(LayerKind::Panel, LayerKind::Fullscreen);
        self.comp
            .layers
            .splice_in_below(LayerKind::Toplevel, LayerKind::Panel);

        self.locked = false;
        tracing::info!("desktop resumed");
        self.repick();
        self.comp.idle_time = self.comp.option_idle_time;
        self.comp.wake();
        self.comp.damage_all();
    }

    // -- screensaver ---------------------------------------------------------

    /// Screensaver protocol request: show `ssid` fullscreen on `output`
    /// beneath any lock surface.
    pub fn screensaver_set_surface(&mut self, ssid: ShellSurfaceId, output: OutputId) -> Result<()> {
        self.reset_surface_role(ssid)?;
        match self.surfaces.get_mut(&ssid) {
            Some(ss) => {
                ss.role = Role::Screensaver;
                ss.fullscreen_output = Some(output);
                ss.output = Some(output);
            }
            None => return Err(ShellError::UnknownSurface),
        }
        self.screensaver.surfaces.push(ssid);
        Ok(())
    }

    pub(crate) fn launch_screensaver(&mut self) {
        // an external screensaver client is handling it
        if self.screensaver.binding.is_some() {
            return;
        }
        let Some(path) = self.screensaver.path.clone() else {
            return;
        };
        if self.screensaver.pid.is_some() {
            tracing::warn!("old screensaver still running");
            return;
        }
        match self.comp.launch_client(&path) {
            Ok((_client, pid)) => self.screensaver.pid = Some(pid),
            Err(err) => tracing::warn!("screensaver launch failed: {err:#}"),
        }
    }

    pub(crate) fn terminate_screensaver(&mut self) {
        if let Some(pid) = self.screensaver.pid {
            self.comp.launcher.terminate(pid);
        }
    }

    pub(crate) fn show_screensaver(&mut self, ssid: ShellSurfaceId) {
        let Some(ss) = self.surfaces.get(&ssid) else {
            return;
        };
        let sid = ss.surface;
        let output = ss.output;
        let lock_sid = self
            .lock_surface
            .and_then(|l| self.surfaces.get(&l))
            .map(|l| l.surface);

        self.comp.layers.remove_surface(sid);
        match lock_sid.and_then(|l| self.comp.layers.layer_of(l).map(|k| (l, k))) {
            Some((lock_sid, kind)) => {
                self.comp.layers.layer_mut(kind).insert_below(lock_sid, sid);
            }
            None => self.comp.layers.layer_mut(LayerKind::Lock).push_top(sid),
        }
        if let Some(s) = self.comp.surface_mut(sid) {
            s.output = output;
        }
        self.comp.damage(sid);
    }

    pub(crate) fn hide_screensaver(&mut self, ssid: ShellSurfaceId) {
        let Some(ss) = self.surfaces.get(&ssid) else {
            return;
        };
        let sid = ss.surface;
        self.comp.layers.remove_surface(sid);
        if let Some(s) = self.comp.surface_mut(sid) {
            s.output = None;
        }
    }
}
