//! Non-deterministic automaton built from the AST
//!
//! A transition leads from one consuming state (or an initial state) to the next consuming
//! state (or a final state) and stands for a whole zero-width path through the AST. It
//! carries the assertions that must hold at the current position and the capture group
//! updates performed along the path.

pub mod generator;
pub mod trace_finder;

use std::fmt;

use smallvec::SmallVec;

use crate::charset::CodePointSet;

pub type StateId = u32;

/// Anchored initial state of the main automaton
pub const INITIAL: StateId = 0;
/// Consumes any code unit and restarts the main automaton, for unanchored search
pub const LOOP_BACK: StateId = 1;
/// Final state of the main automaton
pub const FINAL: StateId = 2;

/// Assertions that must hold at the position a transition is taken
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GuardSet(u64);

impl GuardSet {
    pub const CARET: u32 = 0;
    pub const DOLLAR: u32 = 1;
    pub const WORD_BOUNDARY: u32 = 2;
    pub const NON_WORD_BOUNDARY: u32 = 3;
    pub const CODE_POINT_BOUNDARY: u32 = 4;
    const LOOKAROUND_BASE: u32 = 5;
    /// Number of lookaround guards that fit
    pub const MAX_LOOKAROUNDS: usize = (64 - Self::LOOKAROUND_BASE) as usize;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn lookaround(index: usize) -> u32 {
        Self::LOOKAROUND_BASE + index as u32
    }

    /// Lookaround index for a guard bit, `None` for position assertions
    pub fn lookaround_index(guard: u32) -> Option<usize> {
        guard
            .checked_sub(Self::LOOKAROUND_BASE)
            .map(|index| index as usize)
    }

    pub fn with(self, guard: u32) -> Self {
        Self(self.0 | (1 << guard))
    }

    pub fn contains(self, guard: u32) -> bool {
        self.0 & (1 << guard) != 0
    }

    pub fn is_subset(self, other: GuardSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = u32> {
        (0..64).filter(move |&bit| self.contains(bit))
    }
}

impl fmt::Debug for GuardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Capture group update performed while taking a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupOp {
    SetStart(u32),
    SetEnd(u32),
    /// Reset groups `first..=last`
    Clear(u32, u32),
}

pub type GroupOps = SmallVec<[GroupOp; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfaTransition {
    pub source: StateId,
    pub target: StateId,
    pub guards: GuardSet,
    pub ops: GroupOps,
    /// Path index in trace finder automata, 0 elsewhere
    pub trace: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NfaStateKind {
    Initial,
    Final,
    LoopBack,
    CharClass(CodePointSet),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfaState {
    pub kind: NfaStateKind,
    /// Outgoing transitions in priority order
    pub next: Vec<u32>,
    /// Incoming transitions, loop-back sources excluded
    pub prev: Vec<u32>,
}

impl NfaState {
    pub(crate) fn new(kind: NfaStateKind) -> Self {
        Self {
            kind,
            next: Vec::new(),
            prev: Vec::new(),
        }
    }

    pub fn char_class(&self) -> Option<&CodePointSet> {
        match &self.kind {
            NfaStateKind::CharClass(set) => Some(set),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomatonKind {
    Main,
    LookAhead,
    LookBehind,
}

/// One connected automaton inside the NFA: the pattern itself or a lookaround body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubAutomaton {
    pub kind: AutomatonKind,
    pub initial: StateId,
    pub final_state: StateId,
    pub negated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Nfa {
    pub states: Vec<NfaState>,
    pub transitions: Vec<NfaTransition>,
    /// Index 0 is the main automaton, index `k + 1` the body of lookaround `k`
    pub automata: Vec<SubAutomaton>,
    /// Capture groups including group 0
    pub group_count: usize,
}

impl Nfa {
    pub fn add_state(&mut self, kind: NfaStateKind) -> StateId {
        self.states.push(NfaState::new(kind));
        (self.states.len() - 1) as StateId
    }

    pub fn add_transition(&mut self, transition: NfaTransition) -> u32 {
        let index = self.transitions.len() as u32;
        self.states[transition.source as usize].next.push(index);
        if transition.source != LOOP_BACK {
            self.states[transition.target as usize].prev.push(index);
        }
        self.transitions.push(transition);
        index
    }

    pub fn state(&self, id: StateId) -> &NfaState {
        &self.states[id as usize]
    }

    pub fn transition(&self, index: u32) -> &NfaTransition {
        &self.transitions[index as usize]
    }

    pub fn lookaround_count(&self) -> usize {
        self.automata.len().saturating_sub(1)
    }

    pub fn lookaround(&self, index: usize) -> Option<&SubAutomaton> {
        self.automata.get(index + 1)
    }

    /// True if the main final state cannot be reached from the main initial state
    pub fn is_dead(&self) -> bool {
        let mut seen = vec![false; self.states.len()];
        let mut stack = vec![INITIAL];
        while let Some(state) = stack.pop() {
            if state == FINAL {
                return false;
            }
            if std::mem::replace(&mut seen[state as usize], true) {
                continue;
            }
            for &t in &self.state(state).next {
                let target = self.transition(t).target;
                let consumable = self
                    .state(target)
                    .char_class()
                    .map_or(true, |set| !set.is_empty());
                if consumable {
                    stack.push(target);
                }
            }
        }
        true
    }

    /// Every path starts at a `^`
    pub fn is_start_anchored(&self) -> bool {
        let next = &self.state(INITIAL).next;
        !next.is_empty()
            && next
                .iter()
                .all(|&t| self.transition(t).guards.contains(GuardSet::CARET))
    }

    /// Every path ends at a `$`
    pub fn ends_with_dollar(&self) -> bool {
        let prev = &self.state(FINAL).prev;
        !prev.is_empty()
            && prev
                .iter()
                .all(|&t| self.transition(t).guards.contains(GuardSet::DOLLAR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_set() {
        let guards = GuardSet::empty()
            .with(GuardSet::CARET)
            .with(GuardSet::lookaround(2));
        assert!(guards.contains(GuardSet::CARET));
        assert!(!guards.contains(GuardSet::DOLLAR));
        assert_eq!(guards.iter().collect::<Vec<_>>(), vec![0, 7]);
        assert_eq!(GuardSet::lookaround_index(7), Some(2));
        assert_eq!(GuardSet::lookaround_index(GuardSet::CODE_POINT_BOUNDARY), None);
        assert!(GuardSet::empty().with(0).is_subset(guards));
        assert!(!guards.is_subset(GuardSet::empty().with(0)));
    }
}
