//! Bootstrap states and their allowed transitions

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapState {
    NeedsLookup,
    NeedsValidation,
    NeedsAccountResolution,
    Linking,
    Done,
    Error,
}

impl BootstrapState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Forward-only, one step at a time; `Error` is reachable from any live state
    pub fn can_transition_to(self, next: Self) -> bool {
        use BootstrapState::*;
        match (self, next) {
            (Done | Error, _) => false,
            (_, Error) => true,
            (NeedsLookup, NeedsValidation)
            | (NeedsValidation, NeedsAccountResolution)
            | (NeedsAccountResolution, Linking)
            | (Linking, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NeedsLookup => "needs_lookup",
            Self::NeedsValidation => "needs_validation",
            Self::NeedsAccountResolution => "needs_account_resolution",
            Self::Linking => "linking",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// States visited by one run, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTrace {
    member_number: String,
    states: Vec<BootstrapState>,
}

impl StateTrace {
    pub fn start(member_number: impl Into<String>) -> Self {
        Self {
            member_number: member_number.into(),
            states: vec![BootstrapState::NeedsLookup],
        }
    }

    pub fn current(&self) -> BootstrapState {
        self.states
            .last()
            .copied()
            .unwrap_or(BootstrapState::NeedsLookup)
    }

    pub fn states(&self) -> &[BootstrapState] {
        &self.states
    }

    pub(crate) fn set_member_number(&mut self, member_number: impl Into<String>) {
        self.member_number = member_number.into();
    }

    pub(crate) fn advance(&mut self, next: BootstrapState) {
        let from = self.current();
        debug_assert!(
            from.can_transition_to(next),
            "illegal bootstrap transition {from} -> {next}"
        );
        tracing::debug!(member_number = %self.member_number, from = %from, to = %next, "bootstrap transition");
        self.states.push(next);
    }

    /// Move to `Error` unless already terminal
    pub(crate) fn fail(&mut self) {
        if !self.current().is_terminal() {
            self.advance(BootstrapState::Error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BootstrapState::*;
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [NeedsLookup, NeedsValidation, NeedsAccountResolution, Linking, Done];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!NeedsLookup.can_transition_to(Linking));
        assert!(!Linking.can_transition_to(NeedsValidation));
        assert!(!NeedsValidation.can_transition_to(Done));
    }

    #[test]
    fn test_error_from_any_live_state() {
        for s in [NeedsLookup, NeedsValidation, NeedsAccountResolution, Linking] {
            assert!(s.can_transition_to(Error));
        }
        assert!(!Done.can_transition_to(Error));
        assert!(!Error.can_transition_to(NeedsLookup));
    }

    #[test]
    fn test_trace_fail_is_idempotent() {
        let mut trace = StateTrace::start("M1001");
        trace.advance(NeedsValidation);
        trace.fail();
        trace.fail();
        assert_eq!(trace.states(), &[NeedsLookup, NeedsValidation, Error]);
        assert!(trace.current().is_terminal());
    }
}
