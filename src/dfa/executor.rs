//! Running DFAs over UTF-16 input

use super::{Dfa, DfaEntry, Direction, DEAD};
use crate::charset::{is_line_terminator, is_word_char};
use crate::input::{inside_surrogate_pair, RegexInput};
use crate::nfa::{GroupOp, GuardSet};
use crate::result::Captures;

/// A lookaround body compiled to its own DFA
#[derive(Debug, Clone)]
pub struct LookaroundDfa {
    pub dfa: Dfa,
    pub negated: bool,
}

/// Everything needed to evaluate guards while running the DFAs of one pattern
#[derive(Debug, Clone, Default)]
pub struct DfaProgram {
    /// Indexed by lookaround number
    pub lookarounds: Vec<LookaroundDfa>,
    pub multiline: bool,
    /// `\b` also treats U+017F and U+212A as word characters (ignore case unicode patterns)
    pub folded_word_chars: bool,
}

impl DfaProgram {
    fn guard_holds<I: RegexInput + ?Sized>(&self, guard: u32, input: &I, position: usize) -> bool {
        match guard {
            GuardSet::CARET => {
                position == 0 || (self.multiline && line_terminator_at(input, position - 1))
            }
            GuardSet::DOLLAR => {
                position == input.len() || (self.multiline && line_terminator_at(input, position))
            }
            GuardSet::WORD_BOUNDARY => is_boundary(input, position, self.folded_word_chars),
            GuardSet::NON_WORD_BOUNDARY => !is_boundary(input, position, self.folded_word_chars),
            GuardSet::CODE_POINT_BOUNDARY => !inside_surrogate_pair(input, position),
            _ => {
                let Some(lookaround) = GuardSet::lookaround_index(guard)
                    .and_then(|index| self.lookarounds.get(index))
                else {
                    return false;
                };
                let limit = match lookaround.dfa.direction {
                    Direction::Forward => input.len(),
                    Direction::Backward => 0,
                };
                let matched = self
                    .run(&lookaround.dfa, input, position, limit, true)
                    .is_some();
                matched != lookaround.negated
            }
        }
    }

    fn entry<'d, I: RegexInput + ?Sized>(
        &self,
        dfa: &'d Dfa,
        state: u32,
        input: &I,
        position: usize,
    ) -> &'d DfaEntry {
        let state = dfa.state(state);
        let mut mask = 0usize;
        for (bit, &guard) in state.guards.iter().enumerate() {
            if self.guard_holds(guard, input, position) {
                mask |= 1 << bit;
            }
        }
        &state.entries[mask]
    }

    /// Run `dfa` from `from` towards `limit` and return the position and result of the last
    /// final transition taken. With `exists` the first final transition ends the run.
    pub fn run<I: RegexInput + ?Sized>(
        &self,
        dfa: &Dfa,
        input: &I,
        from: usize,
        limit: usize,
        exists: bool,
    ) -> Option<(usize, u16)> {
        let mut state = dfa.start;
        let mut position = from;
        let mut last = None;
        while state != DEAD {
            let entry = self.entry(dfa, state, input, position);
            if let Some(info) = entry.final_info {
                last = Some((position, info.result));
                if exists {
                    break;
                }
            }
            if position == limit {
                break;
            }
            let unit = match dfa.direction {
                Direction::Forward => {
                    position += 1;
                    input.code_unit(position - 1)
                }
                Direction::Backward => {
                    position -= 1;
                    input.code_unit(position)
                }
            };
            state = entry.next[dfa.classes.class_of(unit)];
        }
        last
    }

    /// Run a tracking DFA from `start` to `end` and report the groups of the last final
    /// transition
    pub fn run_captures<I: RegexInput + ?Sized>(
        &self,
        dfa: &Dfa,
        input: &I,
        start: usize,
        end: usize,
        group_count: usize,
    ) -> Option<Captures> {
        let mut threads: Vec<Vec<i32>> = vec![vec![-1; group_count * 2]];
        let mut state = dfa.start;
        let mut position = start;
        let mut result = None;
        while state != DEAD {
            let entry = self.entry(dfa, state, input, position);
            if let Some(info) = entry.final_info {
                let mut slots = threads[info.thread as usize].clone();
                apply_ops(dfa, info.transition, &mut slots, position);
                result = Some(slots);
            }
            if position == end {
                break;
            }
            let class = dfa.classes.class_of(input.code_unit(position));
            state = entry.next[class];
            if state != DEAD {
                threads = entry.moves[class]
                    .iter()
                    .map(|&(source, transition)| {
                        let mut slots = threads[source as usize].clone();
                        apply_ops(dfa, transition, &mut slots, position);
                        slots
                    })
                    .collect();
            }
            position += 1;
        }
        result.map(Captures::from_indices)
    }
}

fn apply_ops(dfa: &Dfa, transition: u32, slots: &mut [i32], position: usize) {
    let Some(ops) = dfa.ops.get(transition as usize) else {
        return;
    };
    for op in ops {
        match *op {
            GroupOp::SetStart(group) => slots[group as usize * 2] = position as i32,
            GroupOp::SetEnd(group) => slots[group as usize * 2 + 1] = position as i32,
            GroupOp::Clear(first, last) => {
                slots[first as usize * 2..=last as usize * 2 + 1].fill(-1);
            }
        }
    }
}

fn line_terminator_at<I: RegexInput + ?Sized>(input: &I, index: usize) -> bool {
    is_line_terminator(u32::from(input.code_unit(index)))
}

fn is_boundary<I: RegexInput + ?Sized>(input: &I, position: usize, folded: bool) -> bool {
    let word_at = |index: usize| is_word_char(u32::from(input.code_unit(index)), folded);
    let before = position > 0 && word_at(position - 1);
    let after = position < input.len() && word_at(position);
    before != after
}
