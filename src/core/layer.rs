//! Layer lists and the global stacking order.
//!
//! Each layer is an ordered list of surfaces (index 0 = topmost). The
//! global Z-order is the concatenation of the layers currently in the
//! order vector; the shell splices whole layers in and out of that vector
//! when locking and unlocking the desktop.

use crate::core::surface::SurfaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Debug overlay, above everything.
    Fade,
    Cursor,
    Fullscreen,
    Panel,
    Toplevel,
    Background,
    /// Only part of the global order while the desktop is locked.
    Lock,
}

#[derive(Debug, Default)]
pub struct Layer {
    /// Surfaces top-to-bottom.
    pub surfaces: Vec<SurfaceId>,
}

impl Layer {
    pub fn push_top(&mut self, sid: SurfaceId) {
        self.surfaces.insert(0, sid);
    }

    pub fn push_bottom(&mut self, sid: SurfaceId) {
        self.surfaces.push(sid);
    }

    /// Inserts `sid` directly below `anchor`. Returns false if the anchor
    /// is not in this layer.
    pub fn insert_below(&mut self, anchor: SurfaceId, sid: SurfaceId) -> bool {
        match self.surfaces.iter().position(|&s| s == anchor) {
            Some(idx) => {
                self.surfaces.insert(idx + 1, sid);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, sid: SurfaceId) -> bool {
        let before = self.surfaces.len();
        self.surfaces.retain(|&s| s != sid);
        self.surfaces.len() != before
    }

    pub fn contains(&self, sid: SurfaceId) -> bool {
        self.surfaces.contains(&sid)
    }
}

#[derive(Debug)]
pub struct LayerStack {
    /// Layers currently in the global order, topmost first.
    order: Vec<LayerKind>,
    fade: Layer,
    cursor: Layer,
    fullscreen: Layer,
    panel: Layer,
    toplevel: Layer,
    background: Layer,
    lock: Layer,
}

impl LayerStack {
    pub fn new() -> Self {
        Self {
            order: vec![
                LayerKind::Fade,
                LayerKind::Cursor,
                LayerKind::Fullscreen,
                LayerKind::Panel,
                LayerKind::Toplevel,
                LayerKind::Background,
            ],
            fade: Layer::default(),
            cursor: Layer::default(),
            fullscreen: Layer::default(),
            panel: Layer::default(),
            toplevel: Layer::default(),
            background: Layer::default(),
            lock: Layer::default(),
        }
    }

    pub fn layer(&self, kind: LayerKind) -> &Layer {
        match kind {
            LayerKind::Fade => &self.fade,
            LayerKind::Cursor => &self.cursor,
            LayerKind::Fullscreen => &self.fullscreen,
            LayerKind::Panel => &self.panel,
            LayerKind::Toplevel => &self.toplevel,
            LayerKind::Background => &self.background,
            LayerKind::Lock => &self.lock,
        }
    }

    pub fn layer_mut(&mut self, kind: LayerKind) -> &mut Layer {
        match kind {
            LayerKind::Fade => &mut self.fade,
            LayerKind::Cursor => &mut self.cursor,
            LayerKind::Fullscreen => &mut self.fullscreen,
            LayerKind::Panel => &mut self.panel,
            LayerKind::Toplevel => &mut self.toplevel,
            LayerKind::Background => &mut self.background,
            LayerKind::Lock => &mut self.lock,
        }
    }

    /// The global layer order, topmost first.
    pub fn order(&self) -> &[LayerKind] {
        &self.order
    }

    pub fn in_order(&self, kind: LayerKind) -> bool {
        self.order.contains(&kind)
    }

    /// Takes a layer out of the global order. Its surface list is kept.
    pub fn splice_out(&mut self, kind: LayerKind) {
        self.order.retain(|&k| k != kind);
    }

    /// Inserts `kind` into the global order directly below `anchor`.
    pub fn splice_in_below(&mut self, kind: LayerKind, anchor: LayerKind) {
        self.splice_out(kind);
        match self.order.iter().position(|&k| k == anchor) {
            Some(idx) => self.order.insert(idx + 1, kind),
            None => self.order.push(kind),
        }
    }

    /// Which layer a surface currently sits in, searching every layer, not
    /// just the ones in the global order.
    pub fn layer_of(&self, sid: SurfaceId) -> Option<LayerKind> {
        const ALL: [LayerKind; 7] = [
            LayerKind::Fade,
            LayerKind::Cursor,
            LayerKind::Fullscreen,
            LayerKind::Panel,
            LayerKind::Toplevel,
            LayerKind::Background,
            LayerKind::Lock,
        ];
        ALL.into_iter().find(|&k| self.layer(k).contains(sid))
    }

    /// Detaches a surface from whatever layer holds it.
    pub fn remove_surface(&mut self, sid: SurfaceId) {
        if let Some(kind) = self.layer_of(sid) {
            self.layer_mut(kind).remove(sid);
        }
    }

    /// Surfaces in global Z-order, topmost first.
    pub fn iter_global(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.order
            .iter()
            .flat_map(|&k| self.layer(k).surfaces.iter().copied())
    }

    /// The surface directly above `sid` in the global order, if any.
    pub fn surface_above(&self, sid: SurfaceId) -> Option<SurfaceId> {
        let mut prev = None;
        for s in self.iter_global() {
            if s == sid {
                return prev;
            }
            prev = Some(s);
        }
        None
    }
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}
