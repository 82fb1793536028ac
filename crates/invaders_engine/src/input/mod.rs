//! Polled keyboard state
//!
//! The game only cares about four logical actions. The window collaborator
//! samples the physical keys once per tick and folds them into an
//! [`InputState`].

use bitflags::bitflags;

bitflags! {
    /// Logical actions held down during the current tick
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InputState: u8 {
        /// Leave the game
        const QUIT = 1 << 0;
        /// Move left
        const LEFT = 1 << 1;
        /// Move right
        const RIGHT = 1 << 2;
        /// Fire trigger
        const FIRE = 1 << 3;
    }
}

/// Physical keys the game polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Escape key
    Escape,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
    /// Left control
    LeftControl,
    /// Space bar
    Space,
}

impl KeyCode {
    /// Every key the window should poll
    pub const POLLED: [KeyCode; 5] = [
        KeyCode::Escape,
        KeyCode::Left,
        KeyCode::Right,
        KeyCode::LeftControl,
        KeyCode::Space,
    ];

    /// Logical action bound to this key
    pub fn action(self) -> InputState {
        match self {
            KeyCode::Escape => InputState::QUIT,
            KeyCode::Left => InputState::LEFT,
            KeyCode::Right => InputState::RIGHT,
            KeyCode::LeftControl | KeyCode::Space => InputState::FIRE,
        }
    }
}

impl InputState {
    /// Fold a set of held keys into logical actions
    pub fn from_keys(keys: impl IntoIterator<Item = KeyCode>) -> Self {
        keys.into_iter().fold(Self::empty(), |state, key| state | key.action())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_keys_merges_bindings() {
        let state = InputState::from_keys([KeyCode::Left, KeyCode::Space]);
        assert!(state.contains(InputState::LEFT | InputState::FIRE));
        assert!(!state.contains(InputState::RIGHT));
    }

    #[test]
    fn test_both_fire_keys_map_to_fire() {
        assert_eq!(KeyCode::LeftControl.action(), InputState::FIRE);
        assert_eq!(KeyCode::Space.action(), InputState::FIRE);
        assert!(InputState::from_keys([]).is_empty());
    }
}
