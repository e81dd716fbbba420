//! winit keys and buttons to the game's key code space

use furrow_services::input::keys;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

const ESCAPE: i32 = 256;

pub fn key_code(key: KeyCode) -> Option<i32> {
    use KeyCode::*;
    let code = match key {
        Space => keys::SPACE,
        Quote => 39,
        Comma => 44,
        Minus => 45,
        Period => 46,
        Slash => 47,
        Digit0 => 48,
        Digit1 => 49,
        Digit2 => 50,
        Digit3 => 51,
        Digit4 => 52,
        Digit5 => 53,
        Digit6 => 54,
        Digit7 => 55,
        Digit8 => 56,
        Digit9 => 57,
        Semicolon => 59,
        Equal => 61,
        KeyA => keys::A,
        KeyB => 66,
        KeyC => 67,
        KeyD => keys::D,
        KeyE => 69,
        KeyF => 70,
        KeyG => 71,
        KeyH => 72,
        KeyI => 73,
        KeyJ => 74,
        KeyK => 75,
        KeyL => 76,
        KeyM => 77,
        KeyN => 78,
        KeyO => 79,
        KeyP => 80,
        KeyQ => 81,
        KeyR => 82,
        KeyS => keys::S,
        KeyT => keys::T,
        KeyU => 85,
        KeyV => 86,
        KeyW => keys::W,
        KeyX => 88,
        KeyY => 89,
        KeyZ => 90,
        BracketLeft => 91,
        Backslash => 92,
        BracketRight => 93,
        Backquote => keys::GRAVE_ACCENT,
        Escape => ESCAPE,
        Enter => keys::ENTER,
        F1 => keys::F1,
        F2 => keys::F2,
        F3 => 292,
        F4 => 293,
        F5 => 294,
        F6 => 295,
        F7 => 296,
        F8 => 297,
        F9 => 298,
        F10 => 299,
        F11 => 300,
        F12 => 301,
        F13 => keys::F13,
        Numpad0 => keys::KP_0,
        Numpad1 => 321,
        Numpad2 => 322,
        Numpad3 => 323,
        Numpad4 => 324,
        Numpad5 => 325,
        Numpad6 => 326,
        Numpad7 => 327,
        Numpad8 => 328,
        Numpad9 => keys::KP_9,
        ControlLeft => keys::LEFT_CONTROL,
        AltLeft => keys::LEFT_ALT,
        ControlRight => keys::RIGHT_CONTROL,
        AltRight => keys::RIGHT_ALT,
        _ => return None,
    };
    Some(code)
}

pub fn mouse_code(button: MouseButton) -> i32 {
    match button {
        MouseButton::Left => keys::MOUSE_LEFT,
        MouseButton::Right => keys::MOUSE_RIGHT,
        MouseButton::Middle => 2,
        MouseButton::Back => 3,
        MouseButton::Forward => 4,
        MouseButton::Other(n) => n as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use furrow_services::input::key_label;

    #[test]
    fn default_bindings_are_reachable() {
        for (key, code) in [
            (KeyCode::KeyW, 87),
            (KeyCode::KeyA, 65),
            (KeyCode::KeyS, 83),
            (KeyCode::KeyD, 68),
            (KeyCode::KeyT, 84),
            (KeyCode::Enter, 257),
            (KeyCode::F1, 290),
            (KeyCode::F2, 291),
        ] {
            assert_eq!(key_code(key), Some(code));
        }
        assert_eq!(mouse_code(MouseButton::Left), 0);
        assert_eq!(mouse_code(MouseButton::Right), 1);
    }

    #[test]
    fn labelled_ranges_map_one_to_one() {
        assert_eq!(key_code(KeyCode::F13), Some(302));
        assert_eq!(key_code(KeyCode::Numpad9), Some(329));
        assert_eq!(key_code(KeyCode::Backquote), Some(96));
        assert!(key_label(key_code(KeyCode::KeyQ).unwrap()).is_some());
        assert_eq!(key_code(KeyCode::CapsLock), None);
    }
}
