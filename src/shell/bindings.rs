//! The (key, button, modifier) binding table and its handlers.

use crate::core::input::{
    Modifiers, ResizeEdges, BTN_LEFT, BTN_MIDDLE, KEY_BACKSPACE, KEY_BRIGHTNESSDOWN,
    KEY_BRIGHTNESSUP, KEY_DOWN, KEY_F9, KEY_F10, KEY_SPACE, KEY_TAB, KEY_UP,
};
use crate::core::layer::LayerKind;
use crate::shell::grabs::switcher::Switcher;
use crate::shell::surface::Role;
use crate::shell::Shell;

pub(crate) type BindingHandler = fn(&mut Shell, time: u32, key: u32, button: u32, pressed: bool);

#[derive(Clone, Copy)]
pub(crate) struct Binding {
    pub key: u32,
    pub button: u32,
    pub modifiers: Modifiers,
    pub handler: BindingHandler,
}

pub(crate) fn install_default_bindings(shell: &mut Shell) {
    let mut add = |key: u32, button: u32, modifiers: Modifiers, handler: BindingHandler| {
        shell.bindings.push(Binding {
            key,
            button,
            modifiers,
            handler,
        });
    };

    add(0, BTN_LEFT, Modifiers::SUPER, move_binding);
    add(0, BTN_MIDDLE, Modifiers::SUPER, resize_binding);
    add(
        KEY_BACKSPACE,
        0,
        Modifiers::CTRL | Modifiers::ALT,
        terminate_binding,
    );
    add(0, BTN_LEFT, Modifiers::empty(), click_to_activate_binding);
    add(KEY_UP, 0, Modifiers::SUPER, zoom_binding);
    add(KEY_DOWN, 0, Modifiers::SUPER, zoom_binding);
    add(
        0,
        BTN_LEFT,
        Modifiers::SUPER | Modifiers::ALT,
        rotate_binding,
    );
    add(KEY_TAB, 0, Modifiers::SUPER, switcher_binding);

    // brightness
    add(KEY_F9, 0, Modifiers::CTRL, backlight_binding);
    add(KEY_BRIGHTNESSDOWN, 0, Modifiers::empty(), backlight_binding);
    add(KEY_F10, 0, Modifiers::CTRL, backlight_binding);
    add(KEY_BRIGHTNESSUP, 0, Modifiers::empty(), backlight_binding);

    add(KEY_SPACE, 0, Modifiers::SUPER, debug_repaint_binding);
}

impl Shell {
    pub(crate) fn run_button_bindings(&mut self, time: u32, button: u32) {
        let modifiers = self.comp.input.modifiers;
        let handlers: Vec<BindingHandler> = self
            .bindings
            .iter()
            .filter(|b| b.key == 0 && b.button == button && b.modifiers == modifiers)
            .map(|b| b.handler)
            .collect();
        for handler in handlers {
            handler(self, time, 0, button, true);
        }
    }

    pub(crate) fn run_key_bindings(&mut self, time: u32, key: u32) {
        let modifiers = self.comp.input.modifiers;
        let handlers: Vec<BindingHandler> = self
            .bindings
            .iter()
            .filter(|b| b.button == 0 && b.key == key && b.modifiers == modifiers)
            .map(|b| b.handler)
            .collect();
        for handler in handlers {
            handler(self, time, key, 0, true);
        }
    }

    /// Toggles the translucent repaint-debugging overlay in the fade layer.
    pub fn toggle_debug_repaint(&mut self) {
        if let Some(sid) = self.debug_surface.take() {
            self.comp.destroy_surface(sid);
            return;
        }
        let sid = self.comp.create_surface(None);
        self.comp.set_color(sid, [1.0, 0.0, 0.0, 0.2]);
        self.comp.surface_configure(sid, 0.0, 0.0, 8192, 8192);
        self.comp.layers.layer_mut(LayerKind::Fade).push_top(sid);
        self.comp.assign_output(sid);
        if let Some(s) = self.comp.surface_mut(sid) {
            // picks must pass through the overlay
            s.input_enabled = false;
            s.update_transform();
            s.geometry_dirty = false;
            // clear the creation damage so only regions repainted from now
            // on get recoloured
            s.damage_count = 0;
        }
        self.debug_surface = Some(sid);
    }
}

/// Surfaces whose role pins them in place.
fn undraggable(role: Role) -> bool {
    matches!(
        role,
        Role::Panel | Role::Background | Role::Fullscreen | Role::Screensaver
    )
}

fn move_binding(shell: &mut Shell, time: u32, _key: u32, _button: u32, _pressed: bool) {
    let Some(focus) = shell.comp.input.pointer_focus else {
        return;
    };
    if undraggable(shell.role_of(focus)) {
        return;
    }
    shell.begin_move(focus, time);
}

fn resize_binding(shell: &mut Shell, time: u32, _key: u32, _button: u32, _pressed: bool) {
    let Some(focus) = shell.comp.input.pointer_focus else {
        return;
    };
    let Some(ssid) = shell.shell_surface_for(focus) else {
        return;
    };
    if undraggable(shell.role_of(focus)) {
        return;
    }

    // derive the edges from which third of the surface was grabbed
    let input = &shell.comp.input;
    let (x, y) = shell
        .comp
        .surface_from_global(focus, input.grab_x, input.grab_y);
    let (width, height) = match shell.comp.surface(focus) {
        Some(s) => (s.width as f64, s.height as f64),
        None => return,
    };

    let mut edges = ResizeEdges::empty();
    if x < width / 3.0 {
        edges |= ResizeEdges::LEFT;
    } else if x >= 2.0 * width / 3.0 {
        edges |= ResizeEdges::RIGHT;
    }
    if y < height / 3.0 {
        edges |= ResizeEdges::TOP;
    } else if y >= 2.0 * height / 3.0 {
        edges |= ResizeEdges::BOTTOM;
    }

    shell.begin_resize(ssid, time, edges);
}

fn rotate_binding(shell: &mut Shell, time: u32, _key: u32, _button: u32, _pressed: bool) {
    let Some(focus) = shell.comp.input.pointer_focus else {
        return;
    };
    let Some(ssid) = shell.shell_surface_for(focus) else {
        return;
    };
    if undraggable(shell.role_of(focus)) {
        return;
    }
    shell.begin_rotate(ssid, time);
}

fn click_to_activate_binding(shell: &mut Shell, time: u32, _key: u32, _button: u32, pressed: bool) {
    if !pressed {
        return;
    }
    let Some(mut focus) = shell.comp.input.pointer_focus else {
        return;
    };

    // A click on a fullscreen surface's black backdrop is meant for the
    // fullscreen surface: it is the backdrop's upper stacking neighbour.
    if let Some(upper) = shell.comp.layers.surface_above(focus) {
        if shell.role_of(upper) == Role::Fullscreen {
            tracing::debug!("raising fullscreen surface above its backdrop");
            if let Some(ssid) = shell.shell_surface_for(upper) {
                shell.stack_fullscreen(ssid);
            }
            focus = upper;
        }
    }

    shell.activate(focus, time);
}

fn zoom_binding(shell: &mut Shell, _time: u32, key: u32, _button: u32, pressed: bool) {
    let (px, py) = (shell.comp.input.x, shell.comp.input.y);
    for out in &mut shell.comp.outputs {
        if !out.region().contains_point(px as i32, py as i32) {
            continue;
        }
        if pressed && key == KEY_UP {
            out.zoom.active = true;
            out.zoom.level -= out.zoom.increment;
        }
        if pressed && key == KEY_DOWN {
            out.zoom.level += out.zoom.increment;
        }
        if out.zoom.level >= 1.0 {
            out.zoom.active = false;
            out.zoom.level = 1.0;
        }
        if out.zoom.level < out.zoom.increment {
            out.zoom.level = out.zoom.increment;
        }
        out.update_zoom(px, py);
    }
}

fn terminate_binding(shell: &mut Shell, _time: u32, _key: u32, _button: u32, pressed: bool) {
    if pressed {
        shell.comp.terminate();
    }
}

fn switcher_binding(shell: &mut Shell, time: u32, _key: u32, _button: u32, _pressed: bool) {
    shell.comp.input.keyboard_focus = None;
    let mut switcher = Switcher::default();
    switcher.next(shell);
    shell.start_keyboard_grab(Box::new(switcher), time);
}

fn backlight_binding(shell: &mut Shell, _time: u32, key: u32, _button: u32, _pressed: bool) {
    // simple case: adjust the primary display only
    let Some(out) = shell.comp.outputs.first_mut() else {
        return;
    };
    let Some(level) = out.backlight else {
        return;
    };
    if (key == KEY_F9 || key == KEY_BRIGHTNESSDOWN) && level > 1 {
        out.backlight = Some(level - 1);
    } else if (key == KEY_F10 || key == KEY_BRIGHTNESSUP) && level < 10 {
        out.backlight = Some(level + 1);
    }
}

fn debug_repaint_binding(shell: &mut Shell, _time: u32, _key: u32, _button: u32, _pressed: bool) {
    shell.toggle_debug_repaint();
}
