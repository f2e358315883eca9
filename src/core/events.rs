//! Outbound events.
//!
//! The shell never talks on the wire itself; it queues [`ShellEvent`]s on
//! the compositor and the host flushes them to the right client at the next
//! dispatch.

use crate::core::compositor::ClientId;
use crate::core::input::{ButtonState, ResizeEdges};
use crate::core::surface::SurfaceId;

#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    /// Asks the client to commit a buffer of the given size.
    Configure {
        surface: SurfaceId,
        time: u32,
        edges: ResizeEdges,
        width: i32,
        height: i32,
    },

    /// The popup's grab ended; the client should dismiss it.
    PopupDone { surface: SurfaceId },

    /// Privileged configure for helper surfaces (backgrounds, panels).
    HelperConfigure {
        client: ClientId,
        surface: SurfaceId,
        time: u32,
        edges: ResizeEdges,
        width: i32,
        height: i32,
    },

    /// Asks the helper to provide a lock surface.
    PrepareLockSurface { client: ClientId },

    /// Pointer motion routed by a popup grab, in surface-local coordinates.
    PointerMotion {
        surface: SurfaceId,
        time: u32,
        sx: f64,
        sy: f64,
    },

    /// Pointer button routed by a popup grab.
    PointerButton {
        surface: SurfaceId,
        time: u32,
        button: u32,
        state: ButtonState,
    },

    /// Fatal protocol error against one client; the host destroys the
    /// offending resource.
    ProtocolError {
        client: ClientId,
        message: &'static str,
    },

    /// Activation notice for the external X11 bridge.
    BridgeActivated { surface: SurfaceId },
}
