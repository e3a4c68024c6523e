//! Compilation limits and switches

/// Limits and switches for the DFA pipeline.
///
/// Every limit is checked before the corresponding structure grows past it. Exceeding one is
/// a bailout: the pattern is handed to the fallback engine instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegexOptions {
    /// Maximum number of states in any generated DFA
    pub max_dfa_size: usize,
    /// Maximum number of NFA states, lookaround sub-automata included
    pub max_nfa_size: usize,
    /// Maximum number of NFA transitions
    pub max_nfa_transitions: usize,
    /// Maximum number of live AST nodes, checked while parsing and while unrolling
    pub max_parse_tree_size: usize,
    /// Counted repetitions with a bound above this are not unrolled
    pub max_counted_repetition: u32,
    /// Maximum number of capture groups, group 0 included
    pub max_capture_groups: usize,
    /// Maximum number of lookaround assertions
    pub max_lookarounds: usize,
    /// Maximum lookaround nesting depth
    pub max_lookaround_nesting: usize,
    /// Maximum number of distinct guards a single DFA state may depend on
    pub max_guards_per_state: usize,
    /// Maximum number of paths the trace finder may enumerate
    pub max_trace_finder_results: usize,
    /// Try the trace finder before falling back to a capture group DFA
    pub trace_finder: bool,
    /// Use the literal engine for patterns that reduce to a fixed string
    pub literal_engine: bool,
}

impl Default for RegexOptions {
    fn default() -> Self {
        Self {
            max_dfa_size: 2400,
            max_nfa_size: 3000,
            max_nfa_transitions: 20_000,
            max_parse_tree_size: 4000,
            max_counted_repetition: 255,
            max_capture_groups: 64,
            max_lookarounds: 59,
            max_lookaround_nesting: 8,
            max_guards_per_state: 6,
            max_trace_finder_results: 254,
            trace_finder: true,
            literal_engine: true,
        }
    }
}
