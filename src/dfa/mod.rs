//! Deterministic automata built from the NFA by subset construction.
//!
//! A DFA state is an ordered list of NFA states ("threads"). The transitions leaving them may
//! depend on assertions, so each DFA state lists the guards its threads care about and keeps
//! one [`DfaEntry`] per combination of guard outcomes. The executor evaluates the guards at
//! the current position, picks the entry and follows it on the next code unit.

pub mod executor;

use std::sync::Arc;

use log::{debug, trace};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::charset::{CodePointSet, MAX_CODE_UNIT};
use crate::error::{RegexError, Result};
use crate::nfa::{GroupOps, GuardSet, Nfa, NfaStateKind, StateId};
use crate::options::RegexOptions;

/// Index of the dead state: no thread survives
pub const DEAD: u32 = u32::MAX;

/// Partition of the code units into classes that no NFA state can tell apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClasses {
    ascii: [u16; 128],
    /// Sorted, disjoint `(lo, hi, class)` intervals covering all code units
    intervals: Vec<(u32, u32, u16)>,
    count: usize,
}

impl CharClasses {
    pub fn new<'a>(sets: impl IntoIterator<Item = &'a CodePointSet>) -> Self {
        let sets: Vec<&CodePointSet> = sets.into_iter().collect();
        let mut boundaries = vec![0u32, MAX_CODE_UNIT + 1];
        for set in &sets {
            for &(lo, hi) in set.ranges() {
                if lo <= MAX_CODE_UNIT {
                    boundaries.push(lo);
                    boundaries.push(hi.min(MAX_CODE_UNIT) + 1);
                }
            }
        }
        boundaries.sort_unstable();
        boundaries.dedup();

        let mut signatures: FxHashMap<Vec<u32>, u16> = FxHashMap::default();
        let mut intervals: Vec<(u32, u32, u16)> = Vec::with_capacity(boundaries.len());
        for pair in boundaries.windows(2) {
            let (lo, hi) = (pair[0], pair[1] - 1);
            let signature: Vec<u32> = sets
                .iter()
                .enumerate()
                .filter(|(_, set)| set.contains(lo))
                .map(|(index, _)| index as u32)
                .collect();
            let next = signatures.len() as u16;
            let class = *signatures.entry(signature).or_insert(next);
            match intervals.last_mut() {
                Some(last) if last.2 == class && last.1 + 1 == lo => last.1 = hi,
                _ => intervals.push((lo, hi, class)),
            }
        }
        let mut ascii = [0u16; 128];
        for &(lo, hi, class) in &intervals {
            for c in lo..=hi.min(127) {
                ascii[c as usize] = class;
            }
        }
        Self {
            ascii,
            intervals,
            count: signatures.len(),
        }
    }

    /// Number of classes
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn class_of(&self, unit: u16) -> usize {
        if unit < 128 {
            return self.ascii[unit as usize] as usize;
        }
        let c = u32::from(unit);
        let index = self.intervals.partition_point(|&(_, hi, _)| hi < c);
        self.intervals.get(index).map_or(0, |&(_, _, class)| class as usize)
    }

    /// Classes fully contained in `set`
    pub fn classes_of(&self, set: &CodePointSet) -> Vec<u16> {
        let mut classes: Vec<u16> = self
            .intervals
            .iter()
            .filter(|&&(lo, _, _)| set.contains(lo))
            .map(|&(_, _, class)| class)
            .collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    pub fn all(&self) -> Vec<u16> {
        (0..self.count as u16).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// First final transition in priority order wins and cuts all lower priority threads
    Priority,
    /// All threads run in parallel, the smallest trace index wins
    Set,
}

/// How to build one DFA out of an NFA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DfaConfig {
    pub direction: Direction,
    pub mode: Mode,
    /// Record which thread each new thread comes from, for capture groups
    pub tracking: bool,
    /// NFA state the DFA starts in
    pub start: StateId,
    /// NFA state whose transitions are final transitions
    pub terminal: StateId,
}

/// A final transition enabled in an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalInfo {
    /// Trace index of the transition, 0 outside trace finders
    pub result: u16,
    /// Thread the transition leaves from
    pub thread: u16,
    /// NFA transition index
    pub transition: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaEntry {
    pub final_info: Option<FinalInfo>,
    /// Successor state per character class
    pub next: Box<[u32]>,
    /// Per character class, `(source thread, NFA transition)` for every successor thread.
    /// Empty unless the DFA tracks threads.
    pub moves: Box<[Box<[(u16, u32)]>]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaState {
    pub threads: Box<[StateId]>,
    /// Guard bits the entries depend on. Entry `i` is taken when bit `j` of `i` is the
    /// outcome of `guards[j]`.
    pub guards: SmallVec<[u32; 4]>,
    pub entries: Box<[DfaEntry]>,
}

#[derive(Debug, Clone)]
pub struct Dfa {
    pub classes: Arc<CharClasses>,
    pub states: Vec<DfaState>,
    pub start: u32,
    pub direction: Direction,
    pub mode: Mode,
    /// Group ops of every NFA transition, present when tracking
    pub ops: Vec<GroupOps>,
}

impl Dfa {
    pub fn state(&self, id: u32) -> &DfaState {
        &self.states[id as usize]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Eager subset construction
pub struct DfaGenerator<'a> {
    nfa: &'a Nfa,
    config: DfaConfig,
    options: &'a RegexOptions,
    /// Character classes matched by each NFA state
    members: Vec<Vec<u16>>,
    class_count: usize,
    ids: FxHashMap<Vec<StateId>, u32>,
    states: Vec<DfaState>,
    pending: Vec<u32>,
}

impl<'a> DfaGenerator<'a> {
    pub fn generate(
        nfa: &'a Nfa,
        classes: Arc<CharClasses>,
        config: DfaConfig,
        options: &'a RegexOptions,
    ) -> Result<Dfa> {
        let all = classes.all();
        let members = nfa
            .states
            .iter()
            .map(|state| match &state.kind {
                NfaStateKind::CharClass(set) => classes.classes_of(set),
                NfaStateKind::LoopBack => all.clone(),
                NfaStateKind::Initial | NfaStateKind::Final => Vec::new(),
            })
            .collect();
        let mut generator = DfaGenerator {
            nfa,
            config,
            options,
            members,
            class_count: classes.count(),
            ids: FxHashMap::default(),
            states: Vec::new(),
            pending: Vec::new(),
        };
        let start = generator.intern(vec![config.start])?;
        while let Some(id) = generator.pending.pop() {
            generator.expand(id)?;
        }
        debug!(
            "DFA ({:?}, {:?}): {} states, {} classes",
            config.direction,
            config.mode,
            generator.states.len(),
            generator.class_count
        );
        let ops = if config.tracking {
            nfa.transitions.iter().map(|t| t.ops.clone()).collect()
        } else {
            Vec::new()
        };
        Ok(Dfa {
            classes,
            states: generator.states,
            start,
            direction: config.direction,
            mode: config.mode,
            ops,
        })
    }

    fn intern(&mut self, threads: Vec<StateId>) -> Result<u32> {
        if threads.is_empty() {
            return Ok(DEAD);
        }
        if let Some(&id) = self.ids.get(&threads) {
            return Ok(id);
        }
        if self.states.len() >= self.options.max_dfa_size {
            return Err(RegexError::unsupported(format!(
                "DFA exceeds {} states",
                self.options.max_dfa_size
            )));
        }
        let id = self.states.len() as u32;
        self.states.push(DfaState {
            threads: threads.clone().into_boxed_slice(),
            guards: SmallVec::new(),
            entries: Box::new([]),
        });
        self.ids.insert(threads, id);
        self.pending.push(id);
        Ok(id)
    }

    fn edges(&self, state: StateId) -> &'a [u32] {
        let state = self.nfa.state(state);
        match self.config.direction {
            Direction::Forward => &state.next,
            Direction::Backward => &state.prev,
        }
    }

    /// The state a transition leads to in the direction of this DFA
    fn destination(&self, transition: u32) -> StateId {
        let t = self.nfa.transition(transition);
        match self.config.direction {
            Direction::Forward => t.target,
            Direction::Backward => t.source,
        }
    }

    fn expand(&mut self, id: u32) -> Result<()> {
        let threads = self.states[id as usize].threads.clone();
        let mut guard_bits = 0u64;
        for &thread in threads.iter() {
            for &t in self.edges(thread) {
                guard_bits |= self.nfa.transition(t).guards.bits();
            }
        }
        let guard_bits = GuardSet::from_bits(guard_bits);
        let guards: SmallVec<[u32; 4]> = guard_bits.iter().collect();
        if guards.len() > self.options.max_guards_per_state {
            return Err(RegexError::unsupported(format!(
                "DFA state depends on {} assertions",
                guards.len()
            )));
        }
        let mut entries = Vec::with_capacity(1 << guards.len());
        for mask in 0..(1usize << guards.len()) {
            let satisfied = guards
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .fold(GuardSet::empty(), |set, (_, &guard)| set.with(guard));
            entries.push(self.entry(&threads, satisfied)?);
        }
        trace!("DFA state {id}: threads {threads:?}, guards {guards:?}");
        let state = &mut self.states[id as usize];
        state.guards = guards;
        state.entries = entries.into_boxed_slice();
        Ok(())
    }

    fn entry(&mut self, threads: &[StateId], satisfied: GuardSet) -> Result<DfaEntry> {
        let mut buckets: Vec<Vec<StateId>> = vec![Vec::new(); self.class_count];
        let mut moves: Vec<Vec<(u16, u32)>> = if self.config.tracking {
            vec![Vec::new(); self.class_count]
        } else {
            Vec::new()
        };
        let mut final_info: Option<FinalInfo> = None;
        'threads: for (index, &thread) in threads.iter().enumerate() {
            for &t in self.edges(thread) {
                let transition = self.nfa.transition(t);
                if !transition.guards.is_subset(satisfied) {
                    continue;
                }
                let destination = self.destination(t);
                if destination == self.config.terminal {
                    let candidate = FinalInfo {
                        result: transition.trace,
                        thread: index as u16,
                        transition: t,
                    };
                    match self.config.mode {
                        Mode::Priority => {
                            final_info = Some(candidate);
                            break 'threads;
                        }
                        Mode::Set => {
                            if final_info.map_or(true, |f| candidate.result < f.result) {
                                final_info = Some(candidate);
                            }
                        }
                    }
                    continue;
                }
                for &class in &self.members[destination as usize] {
                    let bucket = &mut buckets[class as usize];
                    if !bucket.contains(&destination) {
                        bucket.push(destination);
                        if let Some(moves) = moves.get_mut(class as usize) {
                            moves.push((index as u16, t));
                        }
                    }
                }
            }
        }
        let mut next = Vec::with_capacity(self.class_count);
        for mut bucket in buckets {
            if self.config.mode == Mode::Set && !self.config.tracking {
                bucket.sort_unstable();
            }
            next.push(self.intern(bucket)?);
        }
        Ok(DfaEntry {
            final_info,
            next: next.into_boxed_slice(),
            moves: moves.into_iter().map(Vec::into_boxed_slice).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_classes_partition() {
        let lower = CodePointSet::from_range('a' as u32, 'z' as u32);
        let vowel = CodePointSet::from_ranges(&[('a' as u32, 'a' as u32), ('e' as u32, 'e' as u32)]);
        let classes = CharClasses::new([&lower, &vowel]);
        // outside, consonant, vowel
        assert_eq!(classes.count(), 3);
        assert_eq!(classes.class_of(b'a' as u16), classes.class_of(b'e' as u16));
        assert_eq!(classes.class_of(b'b' as u16), classes.class_of(b'z' as u16));
        assert_eq!(classes.class_of(b'A' as u16), classes.class_of(0x4e00));
        assert_ne!(classes.class_of(b'a' as u16), classes.class_of(b'b' as u16));
        assert_eq!(classes.classes_of(&lower).len(), 2);
        assert_eq!(classes.classes_of(&vowel), vec![classes.class_of(b'a' as u16) as u16]);
    }

    #[test]
    fn test_non_ascii_lookup() {
        let greek = CodePointSet::from_range(0x391, 0x3a9);
        let classes = CharClasses::new([&greek]);
        assert_eq!(classes.count(), 2);
        assert_ne!(classes.class_of(0x391), classes.class_of(0x390));
        assert_eq!(classes.class_of(0x3a9), classes.class_of(0x391));
        assert_eq!(classes.class_of(0xffff), classes.class_of(0));
    }
}
