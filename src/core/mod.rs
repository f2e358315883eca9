pub mod compositor;
pub mod errors;
pub mod events;
pub mod input;
pub mod layer;
pub mod output;
pub mod process;
pub mod surface;

// Re-export key types
pub use compositor::{ClientId, Compositor, CompositorPhase};
pub use errors::ShellError;
pub use events::ShellEvent;
pub use layer::{Layer, LayerKind, LayerStack};
pub use output::{Output, OutputId};
pub use surface::{Surface, SurfaceId};
