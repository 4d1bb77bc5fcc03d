//! Keyboard shortcuts of the control surface.

use marquee_config::ControlsConfig;

/// Named keys the player reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Named {
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Escape,
}

/// A pressed key, as reported by the host's `keydown` handler
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Named(Named),
    Character(String),
    Unidentified,
}

impl Key {
    /// Parses a DOM `KeyboardEvent.key` value
    pub fn from_dom(key: &str) -> Self {
        match key {
            " " | "Spacebar" => Key::Named(Named::Space),
            "ArrowLeft" | "Left" => Key::Named(Named::ArrowLeft),
            "ArrowRight" | "Right" => Key::Named(Named::ArrowRight),
            "ArrowUp" | "Up" => Key::Named(Named::ArrowUp),
            "ArrowDown" | "Down" => Key::Named(Named::ArrowDown),
            "Escape" | "Esc" => Key::Named(Named::Escape),
            other if other.chars().count() == 1 => {
                Key::Character(other.to_string())
            }
            _ => Key::Unidentified,
        }
    }
}

/// Element holding keyboard focus when the key was pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FocusTarget {
    #[default]
    Player,
    TextInput,
    TextArea,
    Other,
}

impl FocusTarget {
    /// Typing into a text field must never trigger shortcuts
    pub fn is_text_entry(&self) -> bool {
        matches!(self, FocusTarget::TextInput | FocusTarget::TextArea)
    }
}

/// What a shortcut asks the control surface to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    TogglePlay,
    SeekBy(f64),
    VolumeBy(f64),
    ToggleFullscreen,
    ExitFullscreen,
    ToggleMute,
    SpeedUp,
    SpeedDown,
}

/// Map a key press to an action. `None` leaves the key to the page.
pub fn action_for(
    key: &Key,
    focus: FocusTarget,
    config: &ControlsConfig,
) -> Option<ControlAction> {
    if focus.is_text_entry() {
        return None;
    }

    match key {
        Key::Named(Named::Space) => Some(ControlAction::TogglePlay),
        Key::Named(Named::ArrowLeft) => {
            Some(ControlAction::SeekBy(-config.seek_step_seconds))
        }
        Key::Named(Named::ArrowRight) => {
            Some(ControlAction::SeekBy(config.seek_step_seconds))
        }
        Key::Named(Named::ArrowUp) => {
            Some(ControlAction::VolumeBy(config.volume_step))
        }
        Key::Named(Named::ArrowDown) => {
            Some(ControlAction::VolumeBy(-config.volume_step))
        }
        Key::Named(Named::Escape) => Some(ControlAction::ExitFullscreen),
        Key::Character(c) if c.eq_ignore_ascii_case("f") => {
            Some(ControlAction::ToggleFullscreen)
        }
        Key::Character(c) if c.eq_ignore_ascii_case("m") => {
            Some(ControlAction::ToggleMute)
        }
        Key::Character(c) if c == ">" => Some(ControlAction::SpeedUp),
        Key::Character(c) if c == "<" => Some(ControlAction::SpeedDown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_use_the_configured_steps() {
        let config = ControlsConfig::default();
        assert_eq!(
            action_for(&Key::from_dom("ArrowLeft"), FocusTarget::Player, &config),
            Some(ControlAction::SeekBy(-10.0))
        );
        assert_eq!(
            action_for(&Key::from_dom("ArrowUp"), FocusTarget::Player, &config),
            Some(ControlAction::VolumeBy(0.1))
        );
    }

    #[test]
    fn letters_are_case_insensitive() {
        let config = ControlsConfig::default();
        for key in ["f", "F"] {
            assert_eq!(
                action_for(&Key::from_dom(key), FocusTarget::Other, &config),
                Some(ControlAction::ToggleFullscreen)
            );
        }
        assert_eq!(
            action_for(&Key::from_dom("M"), FocusTarget::Player, &config),
            Some(ControlAction::ToggleMute)
        );
    }

    #[test]
    fn text_fields_swallow_nothing() {
        let config = ControlsConfig::default();
        for focus in [FocusTarget::TextInput, FocusTarget::TextArea] {
            assert_eq!(action_for(&Key::from_dom(" "), focus, &config), None);
            assert_eq!(action_for(&Key::from_dom("f"), focus, &config), None);
        }
    }

    #[test]
    fn unknown_keys_pass_through() {
        let config = ControlsConfig::default();
        assert_eq!(
            action_for(&Key::from_dom("Tab"), FocusTarget::Player, &config),
            None
        );
        assert_eq!(
            action_for(&Key::from_dom("q"), FocusTarget::Player, &config),
            None
        );
    }
}
