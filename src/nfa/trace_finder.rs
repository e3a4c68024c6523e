//! Trace finder: resolve capture groups of loop-free patterns without a capture group DFA.
//!
//! Every path from the initial to the final state of a loop-free NFA is enumerated in
//! priority order. Each path fixes the length of the match and the offsets of all groups, so
//! it becomes a [`PreCalculatedResult`]. The paths are then laid out side by side as chains
//! in a new NFA whose transitions carry the path index; running it backwards from the match
//! end tells which path produced the match.

use log::debug;
use smallvec::SmallVec;

use super::{
    AutomatonKind, GroupOp, Nfa, NfaStateKind, NfaTransition, StateId, SubAutomaton, FINAL,
    INITIAL, LOOP_BACK,
};
use crate::error::{RegexError, Result};
use crate::options::RegexOptions;
use crate::result::PreCalculatedResult;

/// Enumerate all paths of `nfa` and build the trace finder automaton.
///
/// Bails out on loops, lookarounds and when the path count exceeds
/// `max_trace_finder_results`.
pub fn generate_trace_finder(
    nfa: &Nfa,
    options: &RegexOptions,
) -> Result<(Nfa, Vec<PreCalculatedResult>)> {
    if nfa.lookaround_count() > 0 {
        return Err(RegexError::unsupported("trace finder: lookarounds"));
    }
    let limit = options.max_trace_finder_results.min(u16::MAX as usize);
    let paths = enumerate_paths(nfa, limit, options.max_nfa_transitions)?;

    let mut results = Vec::with_capacity(paths.len());
    let mut finder = Nfa {
        group_count: nfa.group_count,
        ..Nfa::default()
    };
    finder.add_state(NfaStateKind::Initial);
    finder.add_state(NfaStateKind::LoopBack);
    finder.add_state(NfaStateKind::Final);
    finder.automata.push(SubAutomaton {
        kind: AutomatonKind::Main,
        initial: INITIAL,
        final_state: FINAL,
        negated: false,
    });
    for (trace, path) in paths.iter().enumerate() {
        results.push(pre_calculate(nfa, path));
        let mut previous = INITIAL;
        for (i, &t) in path.iter().enumerate() {
            let original = nfa.transition(t);
            let target = if i + 1 == path.len() {
                FINAL
            } else {
                if finder.states.len() >= options.max_nfa_size {
                    return Err(RegexError::unsupported("trace finder: too many states"));
                }
                finder.add_state(nfa.state(original.target).kind.clone())
            };
            finder.add_transition(NfaTransition {
                source: previous,
                target,
                guards: original.guards,
                ops: original.ops.clone(),
                trace: trace as u16,
            });
            previous = target;
        }
    }
    debug!(
        "trace finder: {} paths, {} states",
        results.len(),
        finder.states.len()
    );
    Ok((finder, results))
}

/// All transition sequences from the initial to the final state, in priority order
fn enumerate_paths(nfa: &Nfa, limit: usize, step_limit: usize) -> Result<Vec<Vec<u32>>> {
    let mut paths = Vec::new();
    let mut path: Vec<u32> = Vec::new();
    let mut on_path = vec![false; nfa.states.len()];
    // (state, index of the next outgoing transition to try)
    let mut stack: SmallVec<[(StateId, usize); 16]> = SmallVec::new();
    stack.push((INITIAL, 0));
    on_path[INITIAL as usize] = true;
    let mut steps = 0usize;
    while let Some(top) = stack.last_mut() {
        let (state, index) = *top;
        top.1 += 1;
        steps += 1;
        if steps > step_limit {
            return Err(RegexError::unsupported("trace finder: too many steps"));
        }
        let Some(&t) = nfa.state(state).next.get(index) else {
            stack.pop();
            on_path[state as usize] = false;
            path.pop();
            continue;
        };
        let target = nfa.transition(t).target;
        if target == FINAL {
            let mut complete = path.clone();
            complete.push(t);
            paths.push(complete);
            if paths.len() > limit {
                return Err(RegexError::unsupported("trace finder: too many paths"));
            }
            continue;
        }
        if target == LOOP_BACK || on_path[target as usize] {
            return Err(RegexError::unsupported("trace finder: pattern has loops"));
        }
        on_path[target as usize] = true;
        path.push(t);
        stack.push((target, 0));
    }
    Ok(paths)
}

fn pre_calculate(nfa: &Nfa, path: &[u32]) -> PreCalculatedResult {
    let mut offsets = vec![-1i32; nfa.group_count * 2];
    for (position, &t) in path.iter().enumerate() {
        for op in &nfa.transition(t).ops {
            match *op {
                GroupOp::SetStart(group) => offsets[group as usize * 2] = position as i32,
                GroupOp::SetEnd(group) => offsets[group as usize * 2 + 1] = position as i32,
                GroupOp::Clear(first, last) => {
                    for slot in &mut offsets[first as usize * 2..=last as usize * 2 + 1] {
                        *slot = -1;
                    }
                }
            }
        }
    }
    PreCalculatedResult::new(path.len() - 1, offsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{RegexFlags, RegexSource};
    use crate::nfa::generator::{prune_dead_branches, unroll_quantifiers, NfaGenerator};
    use crate::parser::parse;

    fn nfa(pattern: &str) -> Nfa {
        let options = RegexOptions::default();
        let mut ast = parse(&RegexSource::new(pattern, RegexFlags::empty()), &options).unwrap();
        unroll_quantifiers(&mut ast, &options).unwrap();
        prune_dead_branches(&mut ast);
        NfaGenerator::create_nfa(&mut ast, &options).unwrap()
    }

    #[test]
    fn test_paths_in_priority_order() {
        let (finder, results) =
            generate_trace_finder(&nfa("(a)|(b)c?"), &RegexOptions::default()).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].create_from_start(0).as_slice(), &[0, 1, 0, 1, -1, -1]);
        assert_eq!(results[1].create_from_start(0).as_slice(), &[0, 2, -1, -1, 0, 1]);
        assert_eq!(results[2].create_from_start(5).as_slice(), &[5, 6, -1, -1, 5, 6]);
        // one chain state per consumed character
        assert_eq!(finder.states.len(), 3 + 1 + 2 + 1);
        assert!(finder
            .state(FINAL)
            .prev
            .iter()
            .map(|&t| finder.transition(t).trace)
            .eq([0, 1, 2]));
    }

    #[test]
    fn test_loops_bail_out() {
        assert!(matches!(
            generate_trace_finder(&nfa("(a)+"), &RegexOptions::default()),
            Err(RegexError::Unsupported(_))
        ));
    }

    #[test]
    fn test_path_limit() {
        let options = RegexOptions {
            max_trace_finder_results: 3,
            ..RegexOptions::default()
        };
        assert!(generate_trace_finder(&nfa("(a|b)(c|d)"), &options).is_err());
        assert!(generate_trace_finder(&nfa("(a|b)c"), &options).is_ok());
    }
}
