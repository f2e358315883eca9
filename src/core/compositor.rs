//! Compositor substrate.
//!
//! [`Compositor`] realizes the slice of the host compositor the shell is
//! allowed to touch: the surface arena, the layer stack, outputs, the one
//! input device, child launching, and the outbound event queue. It is state
//! only; rendering, buffers, and wire dispatch live with the host.

use std::collections::HashMap;

use anyhow::Result;

use crate::core::events::ShellEvent;
use crate::core::input::InputDevice;
use crate::core::layer::LayerStack;
use crate::core::output::{Output, OutputId};
use crate::core::process::ClientLauncher;
use crate::core::surface::{Surface, SurfaceId};

/// Handle for one protocol client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u32);

/// Power/idle state of the compositor as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorPhase {
    Active,
    Idle,
}

/// A pending zoom-in animation on a freshly mapped surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomAnimation {
    pub surface: SurfaceId,
    pub from: f64,
    pub to: f64,
}

pub struct Compositor {
    surfaces: HashMap<SurfaceId, Surface>,
    next_surface_id: u32,
    next_client_id: u32,
    pub layers: LayerStack,
    pub outputs: Vec<Output>,
    pub input: InputDevice,
    pub launcher: Box<dyn ClientLauncher>,
    pub pending_events: Vec<ShellEvent>,
    pub animations: Vec<ZoomAnimation>,
    /// Seconds of inactivity before the host idles the compositor.
    pub idle_time: u32,
    /// The configured idle timeout, restored when a lock cycle ends.
    pub option_idle_time: u32,
    pub phase: CompositorPhase,
    /// Whether an X11 bridge wants activation notices.
    pub x_bridge: bool,
    time_ms: u32,
    repaints_scheduled: u32,
    surfaces_destroyed: u32,
    pub terminate_requested: bool,
}

impl Compositor {
    /// A compositor with a single 1920×1080 output at the origin.
    pub fn new(launcher: Box<dyn ClientLauncher>) -> Self {
        Self {
            surfaces: HashMap::new(),
            next_surface_id: 0,
            next_client_id: 0,
            layers: LayerStack::new(),
            outputs: vec![Output::new(OutputId(0), "default", 1920, 1080)],
            input: InputDevice::new(),
            launcher,
            pending_events: Vec::new(),
            animations: Vec::new(),
            idle_time: 300,
            option_idle_time: 300,
            phase: CompositorPhase::Active,
            x_bridge: false,
            time_ms: 0,
            repaints_scheduled: 0,
            surfaces_destroyed: 0,
            terminate_requested: false,
        }
    }

    // -- clock ---------------------------------------------------------------

    /// Current event timestamp in milliseconds, advanced by the host.
    pub fn now(&self) -> u32 {
        self.time_ms
    }

    pub fn set_time(&mut self, ms: u32) {
        self.time_ms = ms;
    }

    // -- clients -------------------------------------------------------------

    pub fn new_client(&mut self) -> ClientId {
        self.next_client_id += 1;
        ClientId(self.next_client_id)
    }

    /// Spawns a binary and registers a client handle for its connection.
    pub fn launch_client(&mut self, path: &str) -> Result<(ClientId, u32)> {
        let pid = self.launcher.launch(path)?;
        let client = self.new_client();
        Ok((client, pid))
    }

    // -- surfaces ------------------------------------------------------------

    pub fn create_surface(&mut self, client: Option<ClientId>) -> SurfaceId {
        self.next_surface_id += 1;
        let id = SurfaceId(self.next_surface_id);
        self.surfaces.insert(id, Surface::new(id, client));
        id
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(&id)
    }

    /// Removes the surface from its layer, drops it from the arena, and
    /// clears any focus it held.
    pub fn destroy_surface(&mut self, id: SurfaceId) {
        self.layers.remove_surface(id);
        if self.surfaces.remove(&id).is_some() {
            self.surfaces_destroyed += 1;
        }
        if self.input.pointer_focus == Some(id) {
            self.input.pointer_focus = None;
        }
        if self.input.keyboard_focus == Some(id) {
            self.input.keyboard_focus = None;
        }
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Every live surface in creation order.
    pub fn surface_ids_ordered(&self) -> Vec<SurfaceId> {
        let mut ids: Vec<SurfaceId> = self.surfaces.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn destroyed_count(&self) -> u32 {
        self.surfaces_destroyed
    }

    pub fn set_position(&mut self, id: SurfaceId, x: f64, y: f64) {
        if let Some(s) = self.surfaces.get_mut(&id) {
            s.x = x;
            s.y = y;
            s.geometry_dirty = true;
            s.update_transform();
        }
    }

    /// Position and size in one step, with damage.
    pub fn surface_configure(&mut self, id: SurfaceId, x: f64, y: f64, width: i32, height: i32) {
        if let Some(s) = self.surfaces.get_mut(&id) {
            s.x = x;
            s.y = y;
            s.width = width;
            s.height = height;
            s.geometry_dirty = true;
            s.update_transform();
            s.damage();
        }
    }

    pub fn set_color(&mut self, id: SurfaceId, rgba: [f32; 4]) {
        if let Some(s) = self.surfaces.get_mut(&id) {
            s.color = Some(rgba);
        }
    }

    pub fn damage(&mut self, id: SurfaceId) {
        if let Some(s) = self.surfaces.get_mut(&id) {
            s.damage();
        }
    }

    pub fn damage_all(&mut self) {
        for s in self.surfaces.values_mut() {
            s.damage();
        }
        self.schedule_repaint();
    }

    pub fn schedule_repaint(&mut self) {
        self.repaints_scheduled += 1;
    }

    pub fn repaint_count(&self) -> u32 {
        self.repaints_scheduled
    }

    // -- coordinates ---------------------------------------------------------

    pub fn surface_to_global(&self, id: SurfaceId, sx: f64, sy: f64) -> (f64, f64) {
        match self.surfaces.get(&id) {
            Some(s) => s.to_global(sx, sy),
            None => (sx, sy),
        }
    }

    pub fn surface_from_global(&self, id: SurfaceId, x: f64, y: f64) -> (f64, f64) {
        match self.surfaces.get(&id) {
            Some(s) => s.from_global(x, y),
            None => (x, y),
        }
    }

    // -- outputs -------------------------------------------------------------

    pub fn add_output(&mut self, output: Output) -> OutputId {
        let id = output.id;
        self.outputs.push(output);
        id
    }

    pub fn default_output(&self) -> Option<&Output> {
        self.outputs.first()
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.iter().find(|o| o.id == id)
    }

    pub fn output_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.outputs.iter_mut().find(|o| o.id == id)
    }

    /// Assigns the surface to the output containing its centre, falling
    /// back to the first output.
    pub fn assign_output(&mut self, id: SurfaceId) {
        let Some(s) = self.surfaces.get(&id) else {
            return;
        };
        let cx = (s.x + s.width as f64 / 2.0) as i32;
        let cy = (s.y + s.height as f64 / 2.0) as i32;
        let assigned = self
            .outputs
            .iter()
            .find(|o| o.region().contains_point(cx, cy))
            .or_else(|| self.outputs.first())
            .map(|o| o.id);
        if let Some(s) = self.surfaces.get_mut(&id) {
            s.output = assigned;
        }
    }

    // -- picking -------------------------------------------------------------

    /// Topmost input-accepting surface under the point, honouring the
    /// current global layer order.
    pub fn pick(&self, x: f64, y: f64) -> Option<SurfaceId> {
        for sid in self.layers.iter_global() {
            if let Some(s) = self.surfaces.get(&sid) {
                if s.input_enabled && s.contains(x, y) {
                    return Some(sid);
                }
            }
        }
        None
    }

    // -- power ---------------------------------------------------------------

    pub fn wake(&mut self) {
        self.phase = CompositorPhase::Active;
    }

    pub fn terminate(&mut self) {
        self.terminate_requested = true;
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("surfaces", &self.surfaces.len())
            .field("outputs", &self.outputs.len())
            .field("phase", &self.phase)
            .field("input", &self.input)
            .finish()
    }
}
