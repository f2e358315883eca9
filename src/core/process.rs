//! Child-process launching for the helper and screensaver clients.
//!
//! The shell only ever needs to spawn a binary, learn its pid, and later
//! deliver SIGTERM; exits come back through the host's child-reap plumbing
//! as calls to `Shell::handle_child_exit`.

use std::collections::HashMap;
use std::process::{Child, Command};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};

/// Launch facility the compositor offers the shell.
pub trait ClientLauncher {
    /// Spawns `path` and returns its pid.
    fn launch(&mut self, path: &str) -> Result<u32>;

    /// Delivers SIGTERM to a previously launched child.
    fn terminate(&mut self, pid: u32);

    /// Called once the host has reaped the child, so the launcher can drop
    /// its handle.
    fn reaped(&mut self, _pid: u32) {}
}

/// Launcher backed by real OS processes.
#[derive(Debug, Default)]
pub struct OsLauncher {
    children: HashMap<u32, Child>,
}

impl OsLauncher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientLauncher for OsLauncher {
    fn launch(&mut self, path: &str) -> Result<u32> {
        let child = Command::new(path)
            .spawn()
            .with_context(|| format!("failed to launch {path}"))?;
        let pid = child.id();
        self.children.insert(pid, child);
        tracing::info!("launched {} (pid {})", path, pid);
        Ok(pid)
    }

    fn terminate(&mut self, pid: u32) {
        // SAFETY: plain signal delivery to a child we spawned.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }

    fn reaped(&mut self, pid: u32) {
        if let Some(mut child) = self.children.remove(&pid) {
            let _ = child.try_wait();
        }
    }
}

/// What a [`StubLauncher`] has been asked to do.
#[derive(Debug, Default)]
pub struct LaunchLog {
    /// `(path, pid)` per launch, in order.
    pub launched: Vec<(String, u32)>,
    pub terminated: Vec<u32>,
    /// When set, every launch fails.
    pub refuse: bool,
    next_pid: u32,
}

/// Recording launcher for tests and the headless demo.
#[derive(Debug, Default)]
pub struct StubLauncher {
    log: Arc<RwLock<LaunchLog>>,
}

impl StubLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the launch log, for assertions.
    pub fn log(&self) -> Arc<RwLock<LaunchLog>> {
        self.log.clone()
    }
}

impl ClientLauncher for StubLauncher {
    fn launch(&mut self, path: &str) -> Result<u32> {
        let mut log = match self.log.write() {
            Ok(log) => log,
            Err(poisoned) => poisoned.into_inner(),
        };
        if log.refuse {
            anyhow::bail!("stub launcher refused {path}");
        }
        log.next_pid += 1;
        let pid = 1000 + log.next_pid;
        log.launched.push((path.to_string(), pid));
        Ok(pid)
    }

    fn terminate(&mut self, pid: u32) {
        if let Ok(mut log) = self.log.write() {
            log.terminated.push(pid);
        }
    }
}
