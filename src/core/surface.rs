//! Compositor surface records.
//!
//! A [`Surface`] is the shell-visible slice of a compositor surface:
//! geometry, stacking metadata, an ordered transform list, and damage
//! bookkeeping. Buffers, rendering, and protocol resources stay with the
//! host compositor.

use crate::core::compositor::ClientId;
use crate::core::output::OutputId;
use crate::util::matrix::Matrix;

/// Stable handle into the compositor's surface arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

/// Identifies who installed a transform entry, so it can be replaced or
/// detached without disturbing the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformTag {
    /// The surface position translation. Always present.
    Position,
    /// Interactive rotation, applied inside the position translation.
    Rotation,
    /// Fullscreen scaling, applied outside the position translation.
    FullscreenScale,
    /// Snapshot of a popup parent's transform, applied outside the
    /// position translation.
    ParentSnapshot,
}

#[derive(Debug, Clone, Copy)]
pub struct TransformEntry {
    pub tag: TransformTag,
    pub matrix: Matrix,
}

/// One compositor surface.
#[derive(Debug)]
pub struct Surface {
    pub id: SurfaceId,
    /// Owning client, if any. Shell-allocated surfaces (black backdrops,
    /// the debug overlay) have none.
    pub client: Option<ClientId>,
    pub x: f64,
    pub y: f64,
    pub width: i32,
    pub height: i32,
    /// 255 = opaque. The switcher dims surfaces through this.
    pub alpha: u8,
    /// Solid-color surfaces carry their RGBA here instead of a buffer.
    pub color: Option<[f32; 4]>,
    /// Transform entries in application order: entries later in the list
    /// are applied after (outside) earlier ones.
    transforms: Vec<TransformEntry>,
    /// Composed local→global matrix; kept in sync by the setters.
    pub transform: Matrix,
    /// True when any entry beyond the position translation is installed.
    pub transform_enabled: bool,
    pub geometry_dirty: bool,
    pub output: Option<OutputId>,
    /// False for surfaces with an empty input region; picks pass through.
    pub input_enabled: bool,
    /// Accumulated damage posts since creation (or since last cleared).
    pub damage_count: u32,
    /// Set when the shell needs the next client commit to re-run placement.
    pub force_configure: bool,
}

impl Surface {
    pub fn new(id: SurfaceId, client: Option<ClientId>) -> Self {
        Self {
            id,
            client,
            x: 0.0,
            y: 0.0,
            width: 0,
            height: 0,
            alpha: 255,
            color: None,
            transforms: vec![TransformEntry {
                tag: TransformTag::Position,
                matrix: Matrix::IDENTITY,
            }],
            transform: Matrix::IDENTITY,
            transform_enabled: false,
            geometry_dirty: false,
            output: None,
            input_enabled: true,
            damage_count: 0,
            force_configure: false,
        }
    }

    /// Recomposes the local→global matrix from the transform list.
    pub fn update_transform(&mut self) {
        for entry in &mut self.transforms {
            if entry.tag == TransformTag::Position {
                entry.matrix = Matrix::translation(self.x, self.y);
            }
        }
        let mut m = Matrix::IDENTITY;
        for entry in &self.transforms {
            m = entry.matrix * m;
        }
        self.transform = m;
        self.transform_enabled = self.transforms.len() > 1;
    }

    /// Installs `matrix` under `tag`, replacing any previous entry with the
    /// same tag. Rotation goes inside the position translation, everything
    /// else outside it.
    pub fn set_transform(&mut self, tag: TransformTag, matrix: Matrix) {
        self.remove_transform(tag);
        let entry = TransformEntry { tag, matrix };
        match tag {
            TransformTag::Rotation => self.transforms.insert(0, entry),
            _ => self.transforms.push(entry),
        }
        self.geometry_dirty = true;
        self.update_transform();
    }

    pub fn remove_transform(&mut self, tag: TransformTag) {
        let before = self.transforms.len();
        self.transforms.retain(|e| e.tag != tag);
        if self.transforms.len() != before {
            self.geometry_dirty = true;
        }
        self.update_transform();
    }

    pub fn has_transform(&self, tag: TransformTag) -> bool {
        self.transforms.iter().any(|e| e.tag == tag)
    }

    /// Surface-local → global.
    pub fn to_global(&self, sx: f64, sy: f64) -> (f64, f64) {
        if self.transform_enabled {
            self.transform.transform_point(sx, sy)
        } else {
            (self.x + sx, self.y + sy)
        }
    }

    /// Global → surface-local. Falls back to the plain translation when the
    /// composed transform is degenerate.
    pub fn from_global(&self, x: f64, y: f64) -> (f64, f64) {
        if self.transform_enabled {
            match self.transform.invert_affine2d() {
                Some(inv) => inv.transform_point(x, y),
                None => (x - self.x, y - self.y),
            }
        } else {
            (x - self.x, y - self.y)
        }
    }

    /// Whether a global point lands on the surface.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (sx, sy) = self.from_global(x, y);
        sx >= 0.0 && sy >= 0.0 && sx < self.width as f64 && sy < self.height as f64
    }

    pub fn damage(&mut self) {
        self.damage_count += 1;
    }
}
