//! Shell error types.

use thiserror::Error;

/// Protocol-level failures the shell can report against a client request.
///
/// These are non-fatal to the shell itself; the host delivers them to the
/// offending client and destroys the resource that raised them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellError {
    #[error("get_shell_surface already requested")]
    AlreadyRequested,

    #[error("cannot reassign surface type")]
    RoleLocked,

    #[error("permission to bind desktop_shell denied")]
    BindDenied,

    #[error("interface object already bound")]
    AlreadyBound,

    #[error("no such surface")]
    UnknownSurface,
}

/// Result type for shell request handlers.
pub type Result<T> = std::result::Result<T, ShellError>;
