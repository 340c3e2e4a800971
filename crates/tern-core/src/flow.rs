//! Flow-analysis result bits and per-variable write states.

use bitflags::bitflags;

bitflags! {
    /// Result of resolving one statement.
    ///
    /// The empty set means control continues normally with no early exits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FlowResult: u8 {
        /// Control never reaches the following statement.
        const NEXT_UNREACHABLE = 1 << 0;
        /// A `break`, `continue` or `return` leaves from inside the statement.
        const HAS_SHORTCUT = 1 << 1;
        /// The statement failed to resolve.
        const ERROR = 1 << 2;
    }
}

impl FlowResult {
    pub const NO_CHANGE: FlowResult = FlowResult::empty();

    pub fn completes_normally(self) -> bool {
        !self.contains(FlowResult::NEXT_UNREACHABLE)
    }
}

/// Definite-assignment state of one variable at a program point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum WriteState {
    /// Never written on any path.
    #[default]
    Unknown,
    /// Written on some paths.
    Possibly,
    /// Written on every path.
    Definitely,
}

impl WriteState {
    /// State after a join of two live paths.
    pub fn join(self, other: WriteState) -> WriteState {
        match (self, other) {
            (WriteState::Definitely, WriteState::Definitely) => WriteState::Definitely,
            (WriteState::Unknown, WriteState::Unknown) => WriteState::Unknown,
            _ => WriteState::Possibly,
        }
    }

    pub fn is_definite(self) -> bool {
        self == WriteState::Definitely
    }

    pub fn is_unwritten(self) -> bool {
        self == WriteState::Unknown
    }
}
