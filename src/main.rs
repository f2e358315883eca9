use std::path::Path;

use anyhow::Result;

use tioga::core::compositor::Compositor;
use tioga::core::input::{ButtonState, Modifiers, BTN_LEFT};
use tioga::core::process::StubLauncher;
use tioga::shell::{FullscreenMethod, Shell, ShellConfig};

/// Headless demo: drives one simulated session through the shell hooks the
/// way a host compositor would. Frontends embed the library instead.
fn main() -> Result<()> {
    // Initialize logging with standardized format
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,tioga=debug");
    }
    tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S".to_string(),
        ))
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .init();

    let comp = Compositor::new(Box::new(StubLauncher::new()));
    let config = ShellConfig::load(Path::new("tioga.ini"));
    let mut shell = Shell::new(comp, config);
    shell.start();

    // a client maps a toplevel
    let client = shell.comp.new_client();
    let surface = shell.comp.create_surface(Some(client));
    let handle = shell.get_shell_surface(client, surface)?;
    shell.set_toplevel(handle)?;
    shell.comp.set_time(1_000);
    shell.map(surface, 640, 480, 0.0, 0.0);
    if let Some(s) = shell.comp.surface(surface) {
        tracing::info!("toplevel mapped at ({:.0}, {:.0})", s.x, s.y);
    }

    // click it
    shell.comp.set_time(2_000);
    shell.set_modifiers(Modifiers::empty());
    if let Some(s) = shell.comp.surface(surface) {
        shell.pointer_motion(2_000, s.x + 10.0, s.y + 10.0);
    }
    shell.pointer_button(2_000, BTN_LEFT, ButtonState::Pressed);
    shell.pointer_button(2_010, BTN_LEFT, ButtonState::Released);

    // fullscreen round trip
    shell.comp.set_time(3_000);
    shell.set_fullscreen(handle, FullscreenMethod::Scale, 0, None)?;
    shell.configure(surface, 0.0, 0.0, 1024, 768);
    shell.set_toplevel(handle)?;

    // lock/unlock handshake
    shell.comp.set_time(4_000);
    if let Some(helper) = shell.helper_client() {
        shell.bind_desktop_shell(helper)?;
    }
    shell.lock();
    shell.unlock();
    shell.helper_unlock();

    for event in shell.comp.pending_events.drain(..) {
        tracing::debug!("event: {:?}", event);
    }
    tracing::info!("session complete");
    Ok(())
}
