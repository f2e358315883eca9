use std::sync::{Arc, RwLock};

use crate::core::compositor::{ClientId, Compositor, CompositorPhase};
use crate::core::errors::ShellError;
use crate::core::events::ShellEvent;
use crate::core::input::{
    ButtonState, KeyState, Modifiers, ResizeEdges, BTN_LEFT, BTN_MIDDLE, KEY_BACKSPACE,
    KEY_DOWN, KEY_F9, KEY_F10, KEY_LEFTMETA, KEY_SPACE, KEY_TAB, KEY_UP,
};
use crate::core::layer::LayerKind;
use crate::core::output::{DpmsLevel, Output, OutputId};
use crate::core::process::{LaunchLog, StubLauncher};
use crate::core::surface::SurfaceId;
use crate::shell::surface::{FullscreenMethod, Role};
use crate::shell::{Shell, ShellConfig, ShellSurfaceId};

fn new_shell() -> (Shell, Arc<RwLock<LaunchLog>>) {
    new_shell_with(ShellConfig::default())
}

fn new_shell_with(config: ShellConfig) -> (Shell, Arc<RwLock<LaunchLog>>) {
    let launcher = StubLauncher::new();
    let log = launcher.log();
    let comp = Compositor::new(Box::new(launcher));
    (Shell::new(comp, config), log)
}

fn screensaver_config() -> ShellConfig {
    ShellConfig::parse(
        "[screensaver]\n\
         path = /usr/bin/ss\n\
         duration = 120\n",
    )
}

fn new_toplevel(shell: &mut Shell, client: ClientId) -> (SurfaceId, ShellSurfaceId) {
    let sid = shell.comp.create_surface(Some(client));
    let ssid = shell.get_shell_surface(client, sid).unwrap();
    shell.set_toplevel(ssid).unwrap();
    (sid, ssid)
}

fn configure_events(shell: &Shell) -> Vec<&ShellEvent> {
    shell
        .comp
        .pending_events
        .iter()
        .filter(|e| matches!(e, ShellEvent::Configure { .. }))
        .collect()
}

// -- scenario 1: toplevel mapping --------------------------------------------

#[test]
fn toplevel_map_places_activates_and_zooms() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, _ssid) = new_toplevel(&mut shell, client);

    shell.map(sid, 100, 100, 0.0, 0.0);

    let s = shell.comp.surface(sid).unwrap();
    assert!((10.0..410.0).contains(&s.x), "x = {}", s.x);
    assert!((10.0..410.0).contains(&s.y), "y = {}", s.y);
    assert!(shell.comp.layers.layer(LayerKind::Toplevel).contains(sid));
    assert_eq!(shell.comp.input.keyboard_focus, Some(sid));
    assert_eq!(shell.comp.animations.len(), 1);
    assert_eq!(shell.comp.animations[0].surface, sid);
    assert_eq!(shell.comp.animations[0].from, 0.8);
    assert_eq!(shell.comp.animations[0].to, 1.0);
}

// -- scenario 2: fullscreen cycle --------------------------------------------

#[test]
fn fullscreen_scale_applies_transform_and_backdrop() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, ssid) = new_toplevel(&mut shell, client);

    shell
        .set_fullscreen(ssid, FullscreenMethod::Scale, 0, None)
        .unwrap();
    match configure_events(&shell).last().unwrap() {
        ShellEvent::Configure {
            edges,
            width,
            height,
            ..
        } => {
            assert_eq!(*edges, ResizeEdges::empty());
            assert_eq!((*width, *height), (1920, 1080));
        }
        _ => unreachable!(),
    }

    // the client commits 1024×768
    shell.map(sid, 1024, 768, 0.0, 0.0);

    let ss = shell.shell_surface(ssid).unwrap();
    let black = ss.fullscreen.black_surface.expect("black backdrop");
    let s = shell.comp.surface(sid).unwrap();
    assert_eq!((s.x, s.y), (0.0, 0.0));
    assert!((s.transform.at(0, 0) - 1.875).abs() < 1e-9);
    assert!((s.transform.at(1, 1) - 1.875).abs() < 1e-9);

    let b = shell.comp.surface(black).unwrap();
    assert_eq!((b.x, b.y), (0.0, 0.0));
    assert_eq!((b.width, b.height), (1920, 1080));
    assert_eq!(
        shell.comp.layers.layer(LayerKind::Fullscreen).surfaces,
        vec![sid, black]
    );
}

#[test]
fn fullscreen_round_trip_restores_position_and_frees_backdrop() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, ssid) = new_toplevel(&mut shell, client);
    shell.map(sid, 200, 100, 0.0, 0.0);
    let before = {
        let s = shell.comp.surface(sid).unwrap();
        (s.x, s.y)
    };

    shell
        .set_fullscreen(ssid, FullscreenMethod::Scale, 0, None)
        .unwrap();
    shell.configure(sid, 0.0, 0.0, 200, 100);
    assert!(shell
        .shell_surface(ssid)
        .unwrap()
        .fullscreen
        .black_surface
        .is_some());

    shell.set_toplevel(ssid).unwrap();
    let s = shell.comp.surface(sid).unwrap();
    assert_eq!((s.x, s.y), before);
    assert!(!s.transform_enabled);
    assert!(s.force_configure);
    // only the backdrop died
    assert_eq!(shell.comp.destroyed_count(), 1);
    assert!(shell
        .shell_surface(ssid)
        .unwrap()
        .fullscreen
        .black_surface
        .is_none());
}

#[test]
fn maximized_round_trip_restores_position() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, ssid) = new_toplevel(&mut shell, client);
    shell.map(sid, 200, 100, 0.0, 0.0);
    let before = {
        let s = shell.comp.surface(sid).unwrap();
        (s.x, s.y)
    };

    shell.set_maximized(ssid, None).unwrap();
    shell.configure(sid, 0.0, 0.0, 1920, 1080);
    shell.set_toplevel(ssid).unwrap();

    let s = shell.comp.surface(sid).unwrap();
    assert_eq!((s.x, s.y), before);
}

#[test]
fn maximized_configure_event_subtracts_panel_height() {
    let (mut shell, _log) = new_shell_with(ShellConfig::default());
    shell.start();
    let helper = shell.helper_client().unwrap();

    // the helper binds a 32 px panel on the default output
    let panel_sid = shell.comp.create_surface(Some(helper));
    let panel_ssid = shell.get_shell_surface(helper, panel_sid).unwrap();
    shell.set_panel(helper, OutputId(0), panel_ssid).unwrap();
    shell.map(panel_sid, 1920, 32, 0.0, 0.0);
    assert!(shell.comp.layers.layer(LayerKind::Panel).contains(panel_sid));

    let client = shell.comp.new_client();
    let (sid, ssid) = new_toplevel(&mut shell, client);
    shell.comp.pending_events.clear();
    shell.set_maximized(ssid, None).unwrap();
    match configure_events(&shell).last().unwrap() {
        ShellEvent::Configure {
            edges,
            width,
            height,
            ..
        } => {
            assert_eq!(*edges, ResizeEdges::TOP | ResizeEdges::LEFT);
            assert_eq!((*width, *height), (1920, 1080 - 32));
        }
        _ => unreachable!(),
    }

    shell.map(sid, 1920, 1048, 0.0, 0.0);
    let s = shell.comp.surface(sid).unwrap();
    assert_eq!((s.x, s.y), (0.0, 32.0));
}

// -- scenario 3: lock with screensaver ---------------------------------------

#[test]
fn lock_cycle_with_screensaver_and_helper_handshake() {
    let (mut shell, log) = new_shell_with(screensaver_config());
    shell.start();
    let helper = shell.helper_client().unwrap();
    shell.bind_desktop_shell(helper).unwrap();
    let original_order = shell.comp.layers.order().to_vec();

    // a screensaver surface registered before the lock
    let saver_client = shell.comp.new_client();
    let saver_sid = shell.comp.create_surface(Some(saver_client));
    let saver_ssid = shell.get_shell_surface(saver_client, saver_sid).unwrap();
    shell
        .screensaver_set_surface(saver_ssid, OutputId(0))
        .unwrap();

    shell.lock();
    assert!(shell.locked);
    {
        let log = log.read().unwrap();
        assert_eq!(log.launched.len(), 2);
        assert_eq!(log.launched[1].0, "/usr/bin/ss");
    }
    assert!(!shell.comp.layers.in_order(LayerKind::Panel));
    assert!(!shell.comp.layers.in_order(LayerKind::Toplevel));
    assert!(!shell.comp.layers.in_order(LayerKind::Fullscreen));
    assert!(shell.comp.layers.in_order(LayerKind::Lock));
    assert_eq!(shell.comp.idle_time, 120);
    assert_eq!(shell.comp.phase, CompositorPhase::Idle);
    assert!(shell.comp.layers.layer(LayerKind::Lock).contains(saver_sid));

    // unlock asks the helper for a lock surface, exactly once
    shell.unlock();
    shell.unlock();
    let prepares = shell
        .comp
        .pending_events
        .iter()
        .filter(|e| matches!(e, ShellEvent::PrepareLockSurface { .. }))
        .count();
    assert_eq!(prepares, 1);

    // the helper provides the lock surface, then unlocks
    let lock_sid = shell.comp.create_surface(Some(helper));
    let lock_ssid = shell.get_shell_surface(helper, lock_sid).unwrap();
    shell.set_lock_surface(lock_ssid).unwrap();
    assert_eq!(shell.lock_surface, Some(lock_ssid));
    shell.map(lock_sid, 400, 200, 0.0, 0.0);
    assert_eq!(
        shell.comp.layers.layer(LayerKind::Lock).surfaces[0],
        lock_sid
    );

    let saver_pid = shell.screensaver.pid.unwrap();
    shell.helper_unlock();
    assert!(!shell.locked);
    assert_eq!(shell.comp.layers.order(), &original_order[..]);
    assert_eq!(shell.comp.idle_time, shell.comp.option_idle_time);
    assert!(log.read().unwrap().terminated.contains(&saver_pid));
    // the saver surface is hidden
    assert!(shell.comp.layers.layer_of(saver_sid).is_none());
}

#[test]
fn screensaver_map_while_locked_shows_below_lock_surface() {
    let (mut shell, _log) = new_shell_with(screensaver_config());
    shell.start();
    let helper = shell.helper_client().unwrap();
    shell.bind_desktop_shell(helper).unwrap();
    shell.lock();

    // helper lock surface arrives first
    shell.unlock();
    let lock_sid = shell.comp.create_surface(Some(helper));
    let lock_ssid = shell.get_shell_surface(helper, lock_sid).unwrap();
    shell.set_lock_surface(lock_ssid).unwrap();
    shell.map(lock_sid, 400, 200, 0.0, 0.0);

    let saver_client = shell.comp.new_client();
    let saver_sid = shell.comp.create_surface(Some(saver_client));
    let saver_ssid = shell.get_shell_surface(saver_client, saver_sid).unwrap();
    shell
        .screensaver_set_surface(saver_ssid, OutputId(0))
        .unwrap();
    shell.map(saver_sid, 1920, 1080, 0.0, 0.0);

    let lock_layer = &shell.comp.layers.layer(LayerKind::Lock).surfaces;
    let lock_pos = lock_layer.iter().position(|&s| s == lock_sid).unwrap();
    let saver_pos = lock_layer.iter().position(|&s| s == saver_sid).unwrap();
    assert_eq!(saver_pos, lock_pos + 1);
    // centred on its output
    let s = shell.comp.surface(saver_sid).unwrap();
    assert_eq!((s.x, s.y), (0.0, 0.0));
}

#[test]
fn screensaver_unmapped_while_unlocked() {
    let (mut shell, _log) = new_shell_with(screensaver_config());
    let client = shell.comp.new_client();
    let sid = shell.comp.create_surface(Some(client));
    let ssid = shell.get_shell_surface(client, sid).unwrap();
    shell.screensaver_set_surface(ssid, OutputId(0)).unwrap();
    shell.map(sid, 1920, 1080, 0.0, 0.0);
    assert!(shell.comp.layers.layer_of(sid).is_none());
}

#[test]
fn lock_while_locked_cycles_dpms() {
    let (mut shell, _log) = new_shell();
    shell.comp.outputs[0].dpms = Some(DpmsLevel::On);
    shell.lock();
    assert_eq!(shell.comp.outputs[0].dpms, Some(DpmsLevel::On));
    shell.lock();
    assert_eq!(shell.comp.outputs[0].dpms, Some(DpmsLevel::Standby));
}

#[test]
fn unlock_with_helper_gone_resumes_immediately() {
    let (mut shell, _log) = new_shell();
    let original_order = shell.comp.layers.order().to_vec();
    shell.lock();
    shell.unlock();
    assert!(!shell.locked);
    assert_eq!(shell.comp.layers.order(), &original_order[..]);
}

#[test]
fn helper_death_while_locked_resumes_desktop() {
    let (mut shell, _log) = new_shell();
    shell.start();
    let helper = shell.helper_client().unwrap();
    shell.bind_desktop_shell(helper).unwrap();
    shell.lock();
    assert!(shell.locked);

    let pid = shell.helper.pid.unwrap();
    shell.handle_child_exit(pid, 1);
    assert!(!shell.locked);
}

// -- scenario 4: helper respawn storm ----------------------------------------

#[test]
fn helper_respawn_gives_up_after_five_deaths_in_window() {
    let (mut shell, log) = new_shell();
    shell.start();
    assert_eq!(log.read().unwrap().launched.len(), 1);

    for _ in 0..5 {
        let pid = shell.helper.pid.unwrap();
        shell.handle_child_exit(pid, 1);
    }
    assert_eq!(log.read().unwrap().launched.len(), 6);

    let pid = shell.helper.pid.unwrap();
    shell.handle_child_exit(pid, 1);
    assert_eq!(log.read().unwrap().launched.len(), 6);
    assert!(shell.helper.pid.is_none());
}

#[test]
fn helper_death_window_resets_after_thirty_seconds() {
    let (mut shell, log) = new_shell();
    shell.start();

    for _ in 0..3 {
        let pid = shell.helper.pid.unwrap();
        shell.handle_child_exit(pid, 1);
    }
    // quiet for more than the window, then one more death
    shell.comp.set_time(31_000);
    let pid = shell.helper.pid.unwrap();
    shell.handle_child_exit(pid, 1);
    assert_eq!(shell.helper.death_count, 1);
    assert_eq!(log.read().unwrap().launched.len(), 5);
}

#[test]
fn screensaver_death_clears_pid_for_relaunch() {
    let (mut shell, log) = new_shell_with(screensaver_config());
    shell.lock();
    let pid = shell.screensaver.pid.unwrap();
    shell.handle_child_exit(pid, 0);
    assert!(shell.screensaver.pid.is_none());

    shell.unlock(); // helper gone: resumes
    shell.lock();
    assert!(shell.screensaver.pid.is_some());
    assert_eq!(
        log.read()
            .unwrap()
            .launched
            .iter()
            .filter(|(p, _)| p == "/usr/bin/ss")
            .count(),
        2
    );
}

// -- scenario 5: privileged binding ------------------------------------------

#[test]
fn desktop_shell_binding_rejected_for_strangers() {
    let (mut shell, _log) = new_shell();
    shell.start();
    let stranger = shell.comp.new_client();
    assert_eq!(
        shell.bind_desktop_shell(stranger),
        Err(ShellError::BindDenied)
    );
    assert!(shell.comp.pending_events.iter().any(|e| matches!(
        e,
        ShellEvent::ProtocolError {
            message: "permission to bind desktop_shell denied",
            ..
        }
    )));

    let helper = shell.helper_client().unwrap();
    assert_eq!(shell.bind_desktop_shell(helper), Ok(()));
}

#[test]
fn screensaver_binding_is_singleton() {
    let (mut shell, _log) = new_shell();
    let a = shell.comp.new_client();
    let b = shell.comp.new_client();
    assert_eq!(shell.bind_screensaver(a), Ok(()));
    assert_eq!(shell.bind_screensaver(b), Err(ShellError::AlreadyBound));
    shell.unbind_screensaver();
    assert_eq!(shell.bind_screensaver(b), Ok(()));
}

#[test]
fn bound_screensaver_client_inhibits_launch_on_lock() {
    let (mut shell, log) = new_shell_with(screensaver_config());
    let external = shell.comp.new_client();
    shell.bind_screensaver(external).unwrap();
    shell.lock();
    assert!(log.read().unwrap().launched.is_empty());
}

// -- scenario 6: switcher ----------------------------------------------------

#[test]
fn switcher_cycles_and_activates_on_release() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (a, _) = new_toplevel(&mut shell, client);
    let (b, _) = new_toplevel(&mut shell, client);
    let (c, _) = new_toplevel(&mut shell, client);
    shell.map(a, 100, 100, 0.0, 0.0);
    shell.map(b, 100, 100, 0.0, 0.0);
    shell.map(c, 100, 100, 0.0, 0.0);

    shell.set_modifiers(Modifiers::SUPER);
    shell.keyboard_key(1_000, KEY_TAB, KeyState::Pressed);
    shell.keyboard_key(1_000, KEY_TAB, KeyState::Released);
    shell.keyboard_key(1_100, KEY_TAB, KeyState::Pressed);

    let alpha = |shell: &Shell, sid| shell.comp.surface(sid).unwrap().alpha;
    assert_eq!(alpha(&shell, a), 64);
    assert_eq!(alpha(&shell, b), 64);
    assert_eq!(alpha(&shell, c), 255);
    assert!(shell.comp.input.has_keyboard_grab());

    shell.set_modifiers(Modifiers::empty());
    shell.keyboard_key(1_200, KEY_LEFTMETA, KeyState::Released);

    assert!(!shell.comp.input.has_keyboard_grab());
    assert_eq!(shell.comp.input.keyboard_focus, Some(c));
    assert_eq!(alpha(&shell, a), 255);
    assert_eq!(alpha(&shell, b), 255);
    assert_eq!(alpha(&shell, c), 255);
    // the activated window is raised
    assert_eq!(shell.comp.layers.layer(LayerKind::Toplevel).surfaces[0], c);
}

#[test]
fn switcher_with_no_candidates_is_harmless() {
    let (mut shell, _log) = new_shell();
    shell.set_modifiers(Modifiers::SUPER);
    shell.keyboard_key(1_000, KEY_TAB, KeyState::Pressed);
    assert!(shell.comp.input.has_keyboard_grab());
    shell.set_modifiers(Modifiers::empty());
    shell.keyboard_key(1_100, KEY_LEFTMETA, KeyState::Released);
    assert!(!shell.comp.input.has_keyboard_grab());
    assert_eq!(shell.comp.input.keyboard_focus, None);
}

#[test]
fn switcher_advances_when_current_surface_dies() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (a, _) = new_toplevel(&mut shell, client);
    let (b, _) = new_toplevel(&mut shell, client);
    let (c, _) = new_toplevel(&mut shell, client);
    shell.map(a, 100, 100, 0.0, 0.0);
    shell.map(b, 100, 100, 0.0, 0.0);
    shell.map(c, 100, 100, 0.0, 0.0);

    shell.set_modifiers(Modifiers::SUPER);
    // current lands on b
    shell.keyboard_key(1_000, KEY_TAB, KeyState::Pressed);
    shell.handle_surface_destroy(b);
    assert!(shell.comp.input.has_keyboard_grab());

    shell.set_modifiers(Modifiers::empty());
    shell.keyboard_key(1_100, KEY_LEFTMETA, KeyState::Released);
    // wrapped back to the first candidate
    assert_eq!(shell.comp.input.keyboard_focus, Some(a));
    let _ = c;
}

// -- grabs -------------------------------------------------------------------

fn mapped_toplevel_at(
    shell: &mut Shell,
    client: ClientId,
    x: f64,
    y: f64,
    w: i32,
    h: i32,
) -> (SurfaceId, ShellSurfaceId) {
    let (sid, ssid) = new_toplevel(shell, client);
    shell.map(sid, w, h, 0.0, 0.0);
    shell.comp.set_position(sid, x, y);
    shell.repick();
    (sid, ssid)
}

#[test]
fn move_grab_translates_surface_until_release() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, ssid) = mapped_toplevel_at(&mut shell, client, 100.0, 100.0, 100, 100);

    shell.pointer_motion(5_000, 150.0, 150.0);
    assert_eq!(shell.comp.input.pointer_focus, Some(sid));
    shell.pointer_button(5_000, BTN_LEFT, ButtonState::Pressed);
    shell.surface_move(ssid, 5_000).unwrap();
    assert!(shell.comp.input.has_pointer_grab());
    assert_eq!(shell.comp.input.pointer_focus, None);

    shell.pointer_motion(5_010, 160.0, 170.0);
    let s = shell.comp.surface(sid).unwrap();
    assert_eq!((s.x, s.y), (110.0, 120.0));

    shell.pointer_button(5_020, BTN_LEFT, ButtonState::Released);
    assert!(!shell.comp.input.has_pointer_grab());
    assert_eq!(shell.comp.input.pointer_focus, Some(sid));
}

#[test]
fn move_request_with_stale_time_is_ignored() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, ssid) = mapped_toplevel_at(&mut shell, client, 100.0, 100.0, 100, 100);

    shell.pointer_motion(5_000, 150.0, 150.0);
    shell.pointer_button(5_000, BTN_LEFT, ButtonState::Pressed);
    shell.surface_move(ssid, 4_999).unwrap();
    assert!(!shell.comp.input.has_pointer_grab());

    // no buttons pressed: also ignored
    shell.pointer_button(5_010, BTN_LEFT, ButtonState::Released);
    shell.surface_move(ssid, 5_000).unwrap();
    assert!(!shell.comp.input.has_pointer_grab());
    let _ = sid;
}

#[test]
fn resize_grab_emits_configure_with_new_size() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, ssid) = mapped_toplevel_at(&mut shell, client, 100.0, 100.0, 100, 100);

    shell.pointer_motion(5_000, 150.0, 150.0);
    shell.pointer_button(5_000, BTN_LEFT, ButtonState::Pressed);
    shell
        .surface_resize(
            ssid,
            5_000,
            (ResizeEdges::RIGHT | ResizeEdges::BOTTOM).bits(),
        )
        .unwrap();
    assert!(shell.comp.input.has_pointer_grab());

    shell.comp.pending_events.clear();
    shell.pointer_motion(5_010, 160.0, 155.0);
    match configure_events(&shell).last().unwrap() {
        ShellEvent::Configure {
            surface,
            edges,
            width,
            height,
            ..
        } => {
            assert_eq!(*surface, sid);
            assert_eq!(*edges, ResizeEdges::RIGHT | ResizeEdges::BOTTOM);
            assert_eq!((*width, *height), (110, 105));
        }
        _ => unreachable!(),
    }
    // the surface itself is untouched; the client commits the new size
    let s = shell.comp.surface(sid).unwrap();
    assert_eq!((s.width, s.height), (100, 100));

    shell.pointer_button(5_020, BTN_LEFT, ButtonState::Released);
    assert!(!shell.comp.input.has_pointer_grab());
}

#[test]
fn resize_rejects_bad_edge_masks_and_fullscreen() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, ssid) = mapped_toplevel_at(&mut shell, client, 100.0, 100.0, 100, 100);

    shell.pointer_motion(5_000, 150.0, 150.0);
    shell.pointer_button(5_000, BTN_LEFT, ButtonState::Pressed);

    for edges in [0u32, 3, 12, 16, 255] {
        shell.surface_resize(ssid, 5_000, edges).unwrap();
        assert!(!shell.comp.input.has_pointer_grab(), "edges {edges}");
    }

    shell.pointer_button(5_001, BTN_LEFT, ButtonState::Released);
    shell
        .set_fullscreen(ssid, FullscreenMethod::Default, 0, None)
        .unwrap();
    shell.pointer_motion(5_010, 150.0, 150.0);
    shell.pointer_button(5_010, BTN_LEFT, ButtonState::Pressed);
    shell
        .surface_resize(ssid, 5_010, ResizeEdges::RIGHT.bits())
        .unwrap();
    assert!(!shell.comp.input.has_pointer_grab());
    let _ = sid;
}

#[test]
fn rotate_grab_composes_rotation_on_release() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, ssid) = mapped_toplevel_at(&mut shell, client, 100.0, 100.0, 100, 100);

    // grab 40 px right of the centre via the chord
    shell.set_modifiers(Modifiers::SUPER | Modifiers::ALT);
    shell.pointer_motion(5_000, 190.0, 150.0);
    shell.pointer_button(5_000, BTN_LEFT, ButtonState::Pressed);
    assert!(shell.comp.input.has_pointer_grab());

    // drag to directly above the centre: a quarter turn
    shell.pointer_motion(5_010, 150.0, 110.0);
    assert!(shell.comp.surface(sid).unwrap().transform_enabled);

    shell.pointer_button(5_020, BTN_LEFT, ButtonState::Released);
    assert!(!shell.comp.input.has_pointer_grab());
    let rotation = shell.shell_surface(ssid).unwrap().rotation;
    assert!((rotation.at(0, 0)).abs() < 1e-9);
    assert!((rotation.at(0, 1) - 1.0).abs() < 1e-9);
    assert!((rotation.at(1, 0) + 1.0).abs() < 1e-9);
    assert!((rotation.at(1, 1)).abs() < 1e-9);
}

#[test]
fn rotate_within_dead_zone_resets_rotation() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, ssid) = mapped_toplevel_at(&mut shell, client, 100.0, 100.0, 100, 100);

    shell.set_modifiers(Modifiers::SUPER | Modifiers::ALT);
    shell.pointer_motion(5_000, 190.0, 150.0);
    shell.pointer_button(5_000, BTN_LEFT, ButtonState::Pressed);

    // inside the 20 px dead zone: transform detached, rotation reset
    shell.pointer_motion(5_010, 155.0, 152.0);
    assert!(!shell.comp.surface(sid).unwrap().transform_enabled);

    shell.pointer_button(5_020, BTN_LEFT, ButtonState::Released);
    let rotation = shell.shell_surface(ssid).unwrap().rotation;
    assert!((rotation.at(0, 0) - 1.0).abs() < 1e-9);
    assert!((rotation.at(0, 1)).abs() < 1e-9);
}

#[test]
fn move_chord_refuses_pinned_roles() {
    let (mut shell, _log) = new_shell();
    shell.start();
    let helper = shell.helper_client().unwrap();
    let sid = shell.comp.create_surface(Some(helper));
    let ssid = shell.get_shell_surface(helper, sid).unwrap();
    shell.set_background(helper, OutputId(0), ssid).unwrap();
    shell.map(sid, 1920, 1080, 0.0, 0.0);

    shell.set_modifiers(Modifiers::SUPER);
    shell.pointer_motion(5_000, 500.0, 500.0);
    assert_eq!(shell.comp.input.pointer_focus, Some(sid));
    shell.pointer_button(5_000, BTN_LEFT, ButtonState::Pressed);
    assert!(!shell.comp.input.has_pointer_grab());
}

#[test]
fn resize_chord_derives_edges_from_grab_point() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, _ssid) = mapped_toplevel_at(&mut shell, client, 0.0, 0.0, 300, 300);

    // bottom-right third
    shell.set_modifiers(Modifiers::SUPER);
    shell.pointer_motion(5_000, 250.0, 250.0);
    shell.pointer_button(5_000, BTN_MIDDLE, ButtonState::Pressed);
    assert!(shell.comp.input.has_pointer_grab());

    shell.comp.pending_events.clear();
    shell.pointer_motion(5_010, 260.0, 240.0);
    match configure_events(&shell).last().unwrap() {
        ShellEvent::Configure { edges, width, height, .. } => {
            assert_eq!(*edges, ResizeEdges::RIGHT | ResizeEdges::BOTTOM);
            assert_eq!((*width, *height), (310, 290));
        }
        _ => unreachable!(),
    }
    shell.pointer_button(5_020, BTN_MIDDLE, ButtonState::Released);
    let _ = sid;
}

// -- popup grab --------------------------------------------------------------

fn popup_fixture(shell: &mut Shell) -> (SurfaceId, SurfaceId, ShellSurfaceId) {
    let client = shell.comp.new_client();
    let (parent_sid, parent_ssid) = new_toplevel(shell, client);
    shell.map(parent_sid, 200, 200, 0.0, 0.0);
    shell.comp.set_position(parent_sid, 100.0, 100.0);
    shell.repick();

    let popup_sid = shell.comp.create_surface(Some(client));
    let popup_ssid = shell.get_shell_surface(client, popup_sid).unwrap();
    shell
        .set_popup(popup_ssid, 5_000, parent_ssid, 10.0, 10.0, 0)
        .unwrap();

    // the click that opened the popup is still held
    shell.pointer_motion(5_000, 150.0, 150.0);
    shell.pointer_button(5_000, BTN_LEFT, ButtonState::Pressed);
    shell.map(popup_sid, 50, 50, 0.0, 0.0);
    (parent_sid, popup_sid, popup_ssid)
}

#[test]
fn popup_positions_against_parent_and_takes_grab() {
    let (mut shell, _log) = new_shell();
    let (parent_sid, popup_sid, ssid) = popup_fixture(&mut shell);

    assert!(shell.comp.input.has_pointer_grab());
    assert!(shell.shell_surface(ssid).unwrap().popup.active);
    // parent transform snapshot carries the popup to (110, 110)
    let global = shell.comp.surface_to_global(popup_sid, 0.0, 0.0);
    assert_eq!(global, (110.0, 110.0));
    // stacked directly below the parent
    let toplevel = &shell.comp.layers.layer(LayerKind::Toplevel).surfaces;
    let p = toplevel.iter().position(|&s| s == parent_sid).unwrap();
    assert_eq!(toplevel.get(p + 1), Some(&popup_sid));
}

#[test]
fn popup_routes_events_to_owning_client_only() {
    let (mut shell, _log) = new_shell();
    let (parent_sid, _popup_sid, _ssid) = popup_fixture(&mut shell);

    shell.comp.pending_events.clear();
    shell.pointer_motion(5_050, 160.0, 160.0);
    assert!(shell.comp.pending_events.iter().any(|e| matches!(
        e,
        ShellEvent::PointerMotion { surface, .. } if *surface == parent_sid
    )));

    // off every surface: suppressed, focus recorded as empty
    shell.comp.pending_events.clear();
    shell.pointer_motion(5_060, 1_500.0, 900.0);
    assert_eq!(shell.comp.input.pointer_focus, None);
    assert!(shell.comp.pending_events.is_empty());
}

#[test]
fn popup_dismissed_on_release_outside_after_initial_up() {
    let (mut shell, _log) = new_shell();
    let (_parent_sid, popup_sid, ssid) = popup_fixture(&mut shell);

    // first release lands outside the client, inside the grace window
    shell.pointer_motion(5_100, 1_500.0, 900.0);
    shell.pointer_button(5_100, BTN_LEFT, ButtonState::Released);
    assert!(shell.comp.input.has_pointer_grab());
    assert!(shell.shell_surface(ssid).unwrap().popup.initial_up);

    // second click outside dismisses
    shell.pointer_button(5_200, BTN_LEFT, ButtonState::Pressed);
    shell.pointer_button(5_210, BTN_LEFT, ButtonState::Released);
    assert!(!shell.comp.input.has_pointer_grab());
    assert!(!shell.shell_surface(ssid).unwrap().popup.active);
    assert!(shell
        .comp
        .pending_events
        .iter()
        .any(|e| matches!(e, ShellEvent::PopupDone { surface } if *surface == popup_sid)));
}

#[test]
fn popup_dismissed_after_grace_window_expires() {
    let (mut shell, _log) = new_shell();
    let (_parent_sid, popup_sid, _ssid) = popup_fixture(&mut shell);

    shell.pointer_motion(5_100, 1_500.0, 900.0);
    shell.pointer_button(5_600, BTN_LEFT, ButtonState::Released);
    assert!(!shell.comp.input.has_pointer_grab());
    assert!(shell
        .comp
        .pending_events
        .iter()
        .any(|e| matches!(e, ShellEvent::PopupDone { surface } if *surface == popup_sid)));
}

#[test]
fn popup_grab_cancelled_when_surface_dies() {
    let (mut shell, _log) = new_shell();
    let (_parent_sid, popup_sid, _ssid) = popup_fixture(&mut shell);
    assert!(shell.comp.input.has_pointer_grab());
    shell.handle_surface_destroy(popup_sid);
    assert!(!shell.comp.input.has_pointer_grab());
}

// -- activation --------------------------------------------------------------

#[test]
fn click_on_black_backdrop_activates_fullscreen_surface() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, ssid) = new_toplevel(&mut shell, client);
    shell
        .set_fullscreen(ssid, FullscreenMethod::Default, 0, None)
        .unwrap();
    shell.map(sid, 1024, 768, 0.0, 0.0);
    let black = shell
        .shell_surface(ssid)
        .unwrap()
        .fullscreen
        .black_surface
        .unwrap();

    // outside the centred surface: the pick lands on the backdrop
    shell.set_modifiers(Modifiers::empty());
    shell.pointer_motion(6_000, 10.0, 10.0);
    assert_eq!(shell.comp.input.pointer_focus, Some(black));

    shell.pointer_button(6_000, BTN_LEFT, ButtonState::Pressed);
    assert_eq!(shell.comp.input.keyboard_focus, Some(sid));
    assert_eq!(
        shell.comp.layers.layer(LayerKind::Fullscreen).surfaces,
        vec![sid, black]
    );
    shell.pointer_button(6_010, BTN_LEFT, ButtonState::Released);
}

#[test]
fn click_to_activate_raises_toplevels() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (a, _) = mapped_toplevel_at(&mut shell, client, 0.0, 0.0, 100, 100);
    let (b, _) = mapped_toplevel_at(&mut shell, client, 50.0, 50.0, 100, 100);
    assert_eq!(shell.comp.layers.layer(LayerKind::Toplevel).surfaces[0], b);

    shell.set_modifiers(Modifiers::empty());
    shell.pointer_motion(6_000, 10.0, 10.0);
    shell.pointer_button(6_000, BTN_LEFT, ButtonState::Pressed);
    assert_eq!(shell.comp.input.keyboard_focus, Some(a));
    assert_eq!(shell.comp.layers.layer(LayerKind::Toplevel).surfaces[0], a);
    shell.pointer_button(6_010, BTN_LEFT, ButtonState::Released);
}

// -- roles -------------------------------------------------------------------

#[test]
fn duplicate_get_shell_surface_is_a_protocol_error() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let sid = shell.comp.create_surface(Some(client));
    shell.get_shell_surface(client, sid).unwrap();
    assert_eq!(
        shell.get_shell_surface(client, sid),
        Err(ShellError::AlreadyRequested)
    );
    assert!(shell.comp.pending_events.iter().any(|e| matches!(
        e,
        ShellEvent::ProtocolError {
            message: "get_shell_surface already requested",
            ..
        }
    )));
}

#[test]
fn lock_and_screensaver_roles_cannot_be_reassigned() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let sid = shell.comp.create_surface(Some(client));
    let ssid = shell.get_shell_surface(client, sid).unwrap();
    shell.screensaver_set_surface(ssid, OutputId(0)).unwrap();

    assert_eq!(shell.set_toplevel(ssid), Err(ShellError::RoleLocked));
    assert_eq!(shell.shell_surface(ssid).unwrap().role, Role::Screensaver);
    assert!(shell.comp.pending_events.iter().any(|e| matches!(
        e,
        ShellEvent::ProtocolError {
            message: "cannot reassign surface type",
            ..
        }
    )));
}

#[test]
fn reset_is_idempotent_for_plain_roles() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let sid = shell.comp.create_surface(Some(client));
    let ssid = shell.get_shell_surface(client, sid).unwrap();
    shell.set_toplevel(ssid).unwrap();
    shell.set_toplevel(ssid).unwrap();
    assert_eq!(shell.shell_surface(ssid).unwrap().role, Role::Toplevel);
}

#[test]
fn transient_inherits_output_and_offsets_from_parent() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (parent_sid, parent_ssid) = mapped_toplevel_at(&mut shell, client, 100.0, 100.0, 200, 200);

    let sid = shell.comp.create_surface(Some(client));
    let ssid = shell.get_shell_surface(client, sid).unwrap();
    shell
        .set_transient(ssid, parent_ssid, 20.0, 30.0, 0)
        .unwrap();
    let s = shell.comp.surface(sid).unwrap();
    assert_eq!((s.x, s.y), (120.0, 130.0));
    assert_eq!(s.output, shell.comp.surface(parent_sid).unwrap().output);
    assert_eq!(shell.shell_surface(ssid).unwrap().role, Role::Transient);
}

#[test]
fn backgrounds_are_unique_per_output() {
    let (mut shell, _log) = new_shell();
    shell.start();
    let helper = shell.helper_client().unwrap();

    let first = shell.comp.create_surface(Some(helper));
    let first_ssid = shell.get_shell_surface(helper, first).unwrap();
    shell.set_background(helper, OutputId(0), first_ssid).unwrap();
    shell.map(first, 1920, 1080, 0.0, 0.0);

    let second = shell.comp.create_surface(Some(helper));
    let second_ssid = shell.get_shell_surface(helper, second).unwrap();
    shell
        .set_background(helper, OutputId(0), second_ssid)
        .unwrap();

    // the old background is fully detached
    assert!(shell.comp.layers.layer_of(first).is_none());
    assert_eq!(shell.comp.surface(first).unwrap().output, None);
    assert_eq!(shell.backgrounds, vec![second_ssid]);
    assert!(shell.comp.pending_events.iter().any(|e| matches!(
        e,
        ShellEvent::HelperConfigure { surface, width: 1920, height: 1080, .. }
        if *surface == second
    )));
}

#[test]
fn surface_destruction_cleans_up_role_state() {
    let (mut shell, _log) = new_shell();
    let client = shell.comp.new_client();
    let (sid, ssid) = new_toplevel(&mut shell, client);
    shell
        .set_fullscreen(ssid, FullscreenMethod::Default, 0, None)
        .unwrap();
    shell.map(sid, 800, 600, 0.0, 0.0);
    assert_eq!(shell.comp.surface_count(), 2);

    shell.handle_surface_destroy(sid);
    assert_eq!(shell.comp.surface_count(), 0);
    assert_eq!(shell.comp.destroyed_count(), 2);
    assert!(shell.shell_surface_for(sid).is_none());
}

// -- secondary bindings ------------------------------------------------------

#[test]
fn zoom_clamps_between_increment_and_one() {
    let (mut shell, _log) = new_shell();
    shell.set_modifiers(Modifiers::SUPER);
    for _ in 0..30 {
        shell.keyboard_key(1_000, KEY_UP, KeyState::Pressed);
        shell.keyboard_key(1_000, KEY_UP, KeyState::Released);
    }
    {
        let zoom = &shell.comp.outputs[0].zoom;
        assert!(zoom.active);
        assert!((zoom.level - zoom.increment).abs() < 1e-9);
    }

    for _ in 0..30 {
        shell.keyboard_key(1_100, KEY_DOWN, KeyState::Pressed);
        shell.keyboard_key(1_100, KEY_DOWN, KeyState::Released);
    }
    let zoom = &shell.comp.outputs[0].zoom;
    assert!(!zoom.active);
    assert_eq!(zoom.level, 1.0);
}

#[test]
fn backlight_clamps_between_one_and_ten() {
    let (mut shell, _log) = new_shell();
    shell.comp.outputs[0].backlight = Some(10);

    shell.set_modifiers(Modifiers::CTRL);
    shell.keyboard_key(1_000, KEY_F10, KeyState::Pressed);
    assert_eq!(shell.comp.outputs[0].backlight, Some(10));

    for _ in 0..12 {
        shell.keyboard_key(1_000, KEY_F9, KeyState::Pressed);
        shell.keyboard_key(1_000, KEY_F9, KeyState::Released);
    }
    assert_eq!(shell.comp.outputs[0].backlight, Some(1));
}

#[test]
fn backlight_untouched_without_support() {
    let (mut shell, _log) = new_shell();
    shell.set_modifiers(Modifiers::CTRL);
    shell.keyboard_key(1_000, KEY_F9, KeyState::Pressed);
    assert_eq!(shell.comp.outputs[0].backlight, None);
}

#[test]
fn terminate_chord_requests_shutdown() {
    let (mut shell, _log) = new_shell();
    shell.set_modifiers(Modifiers::CTRL | Modifiers::ALT);
    shell.keyboard_key(1_000, KEY_BACKSPACE, KeyState::Pressed);
    assert!(shell.comp.terminate_requested);
}

#[test]
fn debug_overlay_toggles_with_cleared_damage() {
    let (mut shell, _log) = new_shell();
    shell.set_modifiers(Modifiers::SUPER);
    shell.keyboard_key(1_000, KEY_SPACE, KeyState::Pressed);
    shell.keyboard_key(1_000, KEY_SPACE, KeyState::Released);

    let overlay = shell.debug_surface.expect("overlay created");
    assert!(shell.comp.layers.layer(LayerKind::Fade).contains(overlay));
    let s = shell.comp.surface(overlay).unwrap();
    assert!(!s.input_enabled);
    assert_eq!(s.damage_count, 0);
    assert_eq!(s.color, Some([1.0, 0.0, 0.0, 0.2]));

    shell.keyboard_key(1_100, KEY_SPACE, KeyState::Pressed);
    assert!(shell.debug_surface.is_none());
    assert!(shell.comp.surface(overlay).is_none());
}

// -- outputs in the picture --------------------------------------------------

#[test]
fn second_output_fullscreen_targets_requested_output() {
    let (mut shell, _log) = new_shell();
    let mut right = Output::new(OutputId(1), "right", 1280, 1024);
    right.x = 1920;
    shell.comp.add_output(right);

    let client = shell.comp.new_client();
    let (sid, ssid) = new_toplevel(&mut shell, client);
    shell
        .set_fullscreen(ssid, FullscreenMethod::Default, 0, Some(OutputId(1)))
        .unwrap();
    match configure_events(&shell).last().unwrap() {
        ShellEvent::Configure { width, height, .. } => {
            assert_eq!((*width, *height), (1280, 1024));
        }
        _ => unreachable!(),
    }

    shell.map(sid, 640, 480, 0.0, 0.0);
    let s = shell.comp.surface(sid).unwrap();
    // centred on the right output
    assert_eq!((s.x, s.y), (1920.0 + 320.0, 272.0));
}
