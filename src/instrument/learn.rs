// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
/// Whether the next qualifying note-on should be assigned to a pad.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LearningState {
    #[default]
    Idle,
    AwaitingPad(usize),
}

impl LearningState {
    /// Toggling the pad being learned cancels learning. Toggling any other pad
    /// starts (or moves) learning to it.
    pub fn toggle(self, pad: usize) -> LearningState {
        match self {
            LearningState::AwaitingPad(current) if current == pad => LearningState::Idle,
            _ => LearningState::AwaitingPad(pad),
        }
    }

    /// The pad awaiting a note, if any.
    pub fn awaiting(self) -> Option<usize> {
        match self {
            LearningState::Idle => None,
            LearningState::AwaitingPad(pad) => Some(pad),
        }
    }

    pub fn is_awaiting(self, pad: usize) -> bool {
        self.awaiting() == Some(pad)
    }
}

#[cfg(test)]
mod test {
    use super::LearningState;

    #[test]
    fn toggle() {
        let state = LearningState::default();
        assert_eq!(LearningState::Idle, state);

        let state = state.toggle(3);
        assert_eq!(LearningState::AwaitingPad(3), state);
        assert!(state.is_awaiting(3));

        // Another pad takes over.
        let state = state.toggle(7);
        assert_eq!(Some(7), state.awaiting());
        assert!(!state.is_awaiting(3));

        // Same pad cancels.
        assert_eq!(LearningState::Idle, state.toggle(7));
    }
}
