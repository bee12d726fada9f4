/// Whether the "assistant is typing" indicator is on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypingIndicator {
    #[default]
    Absent,
    Shown,
}

impl TypingIndicator {
    /// Returns `true` only on the Absent -> Shown transition, so callers
    /// draw at most one indicator.
    pub fn show(&mut self) -> bool {
        match self {
            TypingIndicator::Absent => {
                *self = TypingIndicator::Shown;
                true
            }
            TypingIndicator::Shown => false,
        }
    }

    pub fn hide(&mut self) -> bool {
        match self {
            TypingIndicator::Shown => {
                *self = TypingIndicator::Absent;
                true
            }
            TypingIndicator::Absent => false,
        }
    }

    #[cfg(test)]
    pub fn is_shown(&self) -> bool {
        *self == TypingIndicator::Shown
    }
}
