//! AST rewriting and NFA construction

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::{
    AutomatonKind, GroupOp, GroupOps, GuardSet, Nfa, NfaStateKind, NfaTransition, StateId,
    SubAutomaton, FINAL, INITIAL, LOOP_BACK,
};
use crate::ast::visitors::{CopyVisitor, DepthFirstTraversal, InitIdVisitor, Visit};
use crate::ast::{AssertionKind, Group, NodeFlags, NodeId, NodeKind, RegexAst, Repeat};
use crate::charset::{MAX_CODE_UNIT, TRAIL_SURROGATES};
use crate::error::{RegexError, Result};
use crate::options::RegexOptions;

/// Replace every quantified term by explicit copies, optional groups and loop groups.
///
/// `x{2,4}` becomes `x x (?:x (?:x)?)?` with empty-checked optional iterations, `x*`
/// becomes a single loop group. Fails before allocating if the unrolled tree would exceed
/// `max_parse_tree_size`.
pub fn unroll_quantifiers(ast: &mut RegexAst, options: &RegexOptions) -> Result<()> {
    let estimate = unrolled_size(ast);
    if estimate > options.max_parse_tree_size as u64 {
        return Err(RegexError::unsupported(format!(
            "unrolling would create {estimate} nodes"
        )));
    }
    let mut quantified = Vec::new();
    let mut traversal = DepthFirstTraversal::new(ast.root());
    while let Some(visit) = traversal.next(ast) {
        if let Visit::Leave(id) = visit {
            if ast.node(id).quantifier.is_some() {
                quantified.push(id);
            }
        }
    }
    // Post-order: inner quantifiers are unrolled before their copies are made
    for term in quantified {
        expand_quantifier(ast, term)?;
    }
    Ok(())
}

/// Upper bound of the node count after unrolling
fn unrolled_size(ast: &RegexAst) -> u64 {
    let mut sizes: FxHashMap<NodeId, u64> = FxHashMap::default();
    let mut traversal = DepthFirstTraversal::new(ast.root());
    let mut total = 0;
    while let Some(visit) = traversal.next(ast) {
        let Visit::Leave(id) = visit else {
            continue;
        };
        let children: u64 = ast
            .children(id)
            .iter()
            .map(|child| sizes.get(child).copied().unwrap_or(1))
            .fold(0u64, u64::saturating_add);
        let mut size = children.saturating_add(1);
        if let Some(q) = ast.node(id).quantifier {
            let copies = u64::from(q.max.unwrap_or(q.min).max(q.min)).max(1);
            // each copy may come with an iteration group and its alternative
            size = size.saturating_add(3).saturating_mul(copies).saturating_add(2);
        }
        sizes.insert(id, size);
        total = size;
    }
    total
}

fn capture_range(ast: &RegexAst, node: NodeId) -> Option<(u32, u32)> {
    let mut range: Option<(u32, u32)> = None;
    let mut traversal = DepthFirstTraversal::new(node);
    while let Some(visit) = traversal.next(ast) {
        if let Visit::Enter(id) = visit {
            if let Some(number) = ast.group(id).and_then(|group| group.capture) {
                range = Some(range.map_or((number, number), |(lo, hi)| {
                    (lo.min(number), hi.max(number))
                }));
            }
        }
    }
    range
}

fn new_group(ast: &mut RegexAst, sequence: NodeId, configure: impl FnOnce(&mut Group)) -> Result<(NodeId, NodeId)> {
    let group = ast.add_group(sequence, None)?;
    ast.node_mut(group).flags |= NodeFlags::EXPANDED_QUANTIFIER;
    if let Some(g) = ast.group_mut(group) {
        configure(g);
    }
    let alternative = ast.add_alternative(group)?;
    Ok((group, alternative))
}

fn expand_quantifier(ast: &mut RegexAst, term: NodeId) -> Result<()> {
    let Some(quantifier) = ast.node_mut(term).quantifier.take() else {
        return Ok(());
    };
    let (min, max, greedy) = (quantifier.min, quantifier.max, quantifier.greedy);
    if max == Some(0) {
        ast.remove_subtree(term);
        return Ok(());
    }
    if min == 1 && max == Some(1) {
        return Ok(());
    }
    let clears = capture_range(ast, term);
    let optional_copies = match max {
        Some(max) => (max - min) as usize,
        None => 1,
    };
    let mut copies = vec![term];
    for _ in 1..(min as usize + optional_copies) {
        copies.push(CopyVisitor::run(ast, term)?);
    }
    let mut copies = copies.into_iter();

    let parent = ast.node(term).parent;
    let wrapper = ast.register(NodeKind::Group(Group::new(None)), parent)?;
    ast.node_mut(wrapper).flags |= NodeFlags::EXPANDED_QUANTIFIER;
    ast.replace_in_parent(term, wrapper);
    let sequence = ast.add_alternative(wrapper)?;

    for copy in copies.by_ref().take(min as usize) {
        if clears.is_some() {
            let (_, inner) = new_group(ast, sequence, |g| g.clears = clears)?;
            ast.attach_term(inner, copy);
        } else {
            ast.attach_term(sequence, copy);
        }
    }
    if max.is_none() {
        let (_, body) = new_group(ast, sequence, |g| {
            g.repeat = Repeat::Loop { greedy };
            g.empty_check = true;
            g.clears = clears;
        })?;
        if let Some(copy) = copies.next() {
            ast.attach_term(body, copy);
        }
        return Ok(());
    }
    let mut current = sequence;
    for i in 0..optional_copies {
        let last = i + 1 == optional_copies;
        let (_, body) = new_group(ast, current, |g| {
            g.repeat = Repeat::Optional { greedy };
            if last {
                g.empty_check = true;
                g.clears = clears;
            }
        })?;
        let Some(copy) = copies.next() else {
            break;
        };
        if last {
            ast.attach_term(body, copy);
        } else {
            let (_, iteration) = new_group(ast, body, |g| {
                g.empty_check = true;
                g.clears = clears;
            })?;
            ast.attach_term(iteration, copy);
            current = body;
        }
    }
    Ok(())
}

/// Remove alternatives that can never match. Returns `false` if the whole pattern is dead.
pub fn prune_dead_branches(ast: &mut RegexAst) -> bool {
    let dead_classes: Vec<NodeId> = {
        let mut found = Vec::new();
        let mut traversal = DepthFirstTraversal::new(ast.root());
        while let Some(visit) = traversal.next(ast) {
            if let Visit::Enter(id) = visit {
                if matches!(&ast.node(id).kind, NodeKind::CharacterClass(set) if set.is_empty()) {
                    found.push(id);
                }
            }
        }
        found
    };
    for class in dead_classes {
        if ast.node(class).is_live() && !kill_term(ast, class) {
            return false;
        }
    }
    true
}

/// Propagate "this term never matches" upwards. Returns `false` when it reaches the root.
fn kill_term(ast: &mut RegexAst, mut term: NodeId) -> bool {
    loop {
        ast.node_mut(term).flags |= NodeFlags::DEAD;
        let Some(sequence) = ast.node(term).parent else {
            return true;
        };
        let Some(group) = ast.node(sequence).parent else {
            return true;
        };
        let (alternatives, repeat) = match ast.group(group) {
            Some(g) => (g.alternatives.len(), g.repeat),
            None => return true,
        };
        if alternatives > 1 {
            ast.remove_subtree(sequence);
            return true;
        }
        if repeat != Repeat::Once {
            // only the skipping branch is left
            ast.remove_subtree(group);
            return true;
        }
        let Some(owner) = ast.node(group).parent else {
            return true;
        };
        match &ast.node(owner).kind {
            NodeKind::Root(_) => {
                ast.node_mut(group).flags |= NodeFlags::DEAD;
                return false;
            }
            NodeKind::LookAhead(root) | NodeKind::LookBehind(root) if root.negated => {
                ast.remove_subtree(owner);
                return true;
            }
            NodeKind::LookAhead(_) | NodeKind::LookBehind(_) => term = owner,
            _ => term = group,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Cursor {
    Enter(NodeId),
    Leave(NodeId),
    EndOfAlternative(NodeId),
    /// Choose between another iteration of an optional or loop group and leaving it
    Iterate(NodeId),
}

#[derive(Debug, Clone)]
struct PathState {
    cursor: Cursor,
    guards: GuardSet,
    ops: GroupOps,
    /// Empty-checked groups entered on this path without consuming anything since
    entered: SmallVec<[NodeId; 4]>,
}

/// A successor found by [`NfaGenerator::successors`]: the consuming node or `MatchFound`
/// reached, with the guards and group ops of the path
struct Successor {
    node: NodeId,
    guards: GuardSet,
    ops: GroupOps,
}

/// Builds the NFA for a rewritten AST
pub struct NfaGenerator<'a> {
    ast: &'a RegexAst,
    options: &'a RegexOptions,
    nfa: Nfa,
    /// Next term in the same sequence, indexed by node id
    next_term: Vec<Option<NodeId>>,
    /// NFA state of each consuming node, indexed by node id
    state_of: Vec<Option<StateId>>,
    lookaround_index: FxHashMap<NodeId, usize>,
    /// MatchFound node -> final state of its automaton
    final_of: FxHashMap<NodeId, StateId>,
    /// Initial state and subtree root of every automaton
    entries: Vec<(StateId, NodeId)>,
    steps: usize,
}

impl<'a> NfaGenerator<'a> {
    pub fn create_nfa(ast: &'a mut RegexAst, options: &'a RegexOptions) -> Result<Nfa> {
        InitIdVisitor::run(ast);
        let ast: &'a RegexAst = ast;
        let mut generator = NfaGenerator {
            ast,
            options,
            nfa: Nfa {
                group_count: ast.group_count(),
                ..Nfa::default()
            },
            next_term: vec![None; ast.number_of_ids()],
            state_of: vec![None; ast.number_of_ids()],
            lookaround_index: FxHashMap::default(),
            final_of: FxHashMap::default(),
            entries: Vec::new(),
            steps: 0,
        };
        generator.index_tree();
        generator.create_automata()?;
        generator.build()?;
        debug!(
            "NFA: {} states, {} transitions, {} lookarounds",
            generator.nfa.states.len(),
            generator.nfa.transitions.len(),
            generator.nfa.lookaround_count()
        );
        Ok(generator.nfa)
    }

    fn index_tree(&mut self) {
        let mut traversal = DepthFirstTraversal::new(self.ast.root());
        while let Some(visit) = traversal.next(self.ast) {
            if let Visit::Enter(id) = visit {
                if let Some(terms) = self.ast.node(id).as_sequence() {
                    for pair in terms.windows(2) {
                        self.next_term[self.ast.node(pair[0]).id] = Some(pair[1]);
                    }
                }
            }
        }
    }

    fn create_automata(&mut self) -> Result<()> {
        let lookarounds = self.ast.lookarounds();
        if lookarounds.len() > self.options.max_lookarounds.min(GuardSet::MAX_LOOKAROUNDS) {
            return Err(RegexError::unsupported(format!(
                "{} lookaround assertions",
                lookarounds.len()
            )));
        }
        let initial = self.nfa.add_state(NfaStateKind::Initial);
        let loop_back = self.nfa.add_state(NfaStateKind::LoopBack);
        let final_state = self.nfa.add_state(NfaStateKind::Final);
        debug_assert_eq!((initial, loop_back, final_state), (INITIAL, LOOP_BACK, FINAL));
        self.nfa.automata.push(SubAutomaton {
            kind: AutomatonKind::Main,
            initial,
            final_state,
            negated: false,
        });
        if let Some(root) = self.ast.node(self.ast.root()).kind.subtree_root() {
            self.final_of.insert(root.match_found, FINAL);
        }
        self.entries.push((INITIAL, self.ast.root()));
        for (index, &lookaround) in lookarounds.iter().enumerate() {
            if self.ast.lookaround_depth(lookaround) > self.options.max_lookaround_nesting {
                return Err(RegexError::unsupported("lookarounds nested too deeply"));
            }
            let (kind, root) = match &self.ast.node(lookaround).kind {
                NodeKind::LookAhead(root) => (AutomatonKind::LookAhead, *root),
                NodeKind::LookBehind(root) => (AutomatonKind::LookBehind, *root),
                _ => continue,
            };
            let initial = self.nfa.add_state(NfaStateKind::Initial);
            let final_state = self.nfa.add_state(NfaStateKind::Final);
            self.nfa.automata.push(SubAutomaton {
                kind,
                initial,
                final_state,
                negated: root.negated,
            });
            self.lookaround_index.insert(lookaround, index);
            self.final_of.insert(root.match_found, final_state);
            self.entries.push((initial, lookaround));
        }
        Ok(())
    }

    fn build(&mut self) -> Result<()> {
        let mut worklist: Vec<(StateId, Cursor)> = Vec::new();
        for &(initial, subtree) in &self.entries {
            if let Some(root) = self.ast.node(subtree).kind.subtree_root() {
                worklist.push((initial, Cursor::Enter(root.group)));
            }
        }
        // Loop-back transitions mirror the main initial state's, so it goes first
        worklist.reverse();
        while let Some((source, cursor)) = worklist.pop() {
            let successors = self.successors(cursor)?;
            for successor in successors {
                let target = match self.target_state(successor.node, &mut worklist)? {
                    Some(target) => target,
                    None => continue,
                };
                let mut guards = successor.guards;
                if source == INITIAL && self.may_start_inside_pair(target) {
                    guards = guards.with(GuardSet::CODE_POINT_BOUNDARY);
                }
                self.push_transition(NfaTransition {
                    source,
                    target,
                    guards,
                    ops: successor.ops,
                    trace: 0,
                })?;
            }
            if source == INITIAL {
                self.add_loop_back()?;
            }
        }
        Ok(())
    }

    /// In unicode mode a match starts on a code point. Only empty matches and first classes
    /// that accept a trail surrogate could start between the halves of a pair.
    fn may_start_inside_pair(&self, target: StateId) -> bool {
        if !self.ast.flags().unicode() {
            return false;
        }
        self.nfa.state(target).char_class().map_or(true, |set| {
            !set.intersect_range(TRAIL_SURROGATES.0, TRAIL_SURROGATES.1)
                .is_empty()
        })
    }

    fn push_transition(&mut self, transition: NfaTransition) -> Result<()> {
        if self.nfa.transitions.len() >= self.options.max_nfa_transitions {
            return Err(RegexError::unsupported("too many NFA transitions"));
        }
        self.nfa.add_transition(transition);
        Ok(())
    }

    fn add_loop_back(&mut self) -> Result<()> {
        let initial_transitions = self.nfa.state(INITIAL).next.clone();
        for t in initial_transitions {
            let mut transition = self.nfa.transition(t).clone();
            transition.source = LOOP_BACK;
            self.push_transition(transition)?;
        }
        self.push_transition(NfaTransition {
            source: LOOP_BACK,
            target: LOOP_BACK,
            guards: GuardSet::empty(),
            ops: GroupOps::new(),
            trace: 0,
        })
    }

    /// State for a consuming node or MatchFound, creating and queueing new states
    fn target_state(
        &mut self,
        node: NodeId,
        worklist: &mut Vec<(StateId, Cursor)>,
    ) -> Result<Option<StateId>> {
        if let Some(&final_state) = self.final_of.get(&node) {
            return Ok(Some(final_state));
        }
        let NodeKind::CharacterClass(set) = &self.ast.node(node).kind else {
            return Ok(None);
        };
        let id = self.ast.node(node).id;
        if let Some(state) = self.state_of[id] {
            return Ok(Some(state));
        }
        if self.nfa.states.len() >= self.options.max_nfa_size {
            return Err(RegexError::unsupported("too many NFA states"));
        }
        let state = self
            .nfa
            .add_state(NfaStateKind::CharClass(set.intersect_range(0, MAX_CODE_UNIT)));
        self.state_of[id] = Some(state);
        worklist.push((state, Cursor::Leave(node)));
        Ok(Some(state))
    }

    /// All zero-width paths from `start` to the next consuming node or MatchFound, in
    /// priority order. Paths dominated by an earlier one are dropped.
    fn successors(&mut self, start: Cursor) -> Result<Vec<Successor>> {
        let mut found: Vec<Successor> = Vec::new();
        let mut visited: FxHashSet<(Cursor, GuardSet, SmallVec<[NodeId; 4]>)> =
            FxHashSet::default();
        let mut stack = vec![PathState {
            cursor: start,
            guards: GuardSet::empty(),
            ops: GroupOps::new(),
            entered: SmallVec::new(),
        }];
        let step_limit = self.options.max_nfa_transitions.saturating_mul(16);
        while let Some(mut path) = stack.pop() {
            self.steps += 1;
            if self.steps > step_limit {
                return Err(RegexError::unsupported("NFA successor enumeration too large"));
            }
            if !visited.insert((path.cursor, path.guards, path.entered.clone())) {
                continue;
            }
            match path.cursor {
                Cursor::Enter(node) => match &self.ast.node(node).kind {
                    NodeKind::CharacterClass(_) | NodeKind::MatchFound => {
                        let dominated = found
                            .iter()
                            .any(|s| s.node == node && s.guards.is_subset(path.guards));
                        if !dominated {
                            found.push(Successor {
                                node,
                                guards: path.guards,
                                ops: path.ops,
                            });
                        }
                    }
                    NodeKind::PositionAssertion(kind) => {
                        let guard = match kind {
                            AssertionKind::Caret => GuardSet::CARET,
                            AssertionKind::Dollar => GuardSet::DOLLAR,
                            AssertionKind::WordBoundary => GuardSet::WORD_BOUNDARY,
                            AssertionKind::NonWordBoundary => GuardSet::NON_WORD_BOUNDARY,
                            AssertionKind::CodePointBoundary => GuardSet::CODE_POINT_BOUNDARY,
                        };
                        path.guards = path.guards.with(guard);
                        path.cursor = Cursor::Leave(node);
                        stack.push(path);
                    }
                    NodeKind::LookAhead(_) | NodeKind::LookBehind(_) => {
                        let Some(&index) = self.lookaround_index.get(&node) else {
                            continue;
                        };
                        path.guards = path.guards.with(GuardSet::lookaround(index));
                        path.cursor = Cursor::Leave(node);
                        stack.push(path);
                    }
                    NodeKind::Group(group) => {
                        if group.repeat == Repeat::Once {
                            self.push_alternatives(node, group, path, &mut stack);
                        } else {
                            path.cursor = Cursor::Iterate(node);
                            stack.push(path);
                        }
                    }
                    NodeKind::Sequence(terms) => {
                        path.cursor = match terms.first() {
                            Some(&first) => Cursor::Enter(first),
                            None => Cursor::EndOfAlternative(node),
                        };
                        stack.push(path);
                    }
                    NodeKind::Root(root) => {
                        path.cursor = Cursor::Enter(root.group);
                        stack.push(path);
                    }
                    NodeKind::BackReference(_) => {
                        return Err(RegexError::unsupported("back-references"));
                    }
                },
                Cursor::Iterate(node) => {
                    let Some(group) = self.ast.group(node) else {
                        continue;
                    };
                    let greedy = match group.repeat {
                        Repeat::Optional { greedy } | Repeat::Loop { greedy } => greedy,
                        Repeat::Once => true,
                    };
                    let mut leave = path.clone();
                    leave.cursor = Cursor::Leave(node);
                    if greedy {
                        stack.push(leave);
                        self.push_alternatives(node, group, path, &mut stack);
                    } else {
                        self.push_alternatives(node, group, path, &mut stack);
                        stack.push(leave);
                    }
                }
                Cursor::EndOfAlternative(sequence) => {
                    let Some(group_id) = self.ast.node(sequence).parent else {
                        continue;
                    };
                    let Some(group) = self.ast.group(group_id) else {
                        continue;
                    };
                    if group.empty_check && path.entered.contains(&group_id) {
                        continue;
                    }
                    if let Some(number) = group.capture {
                        path.ops.push(GroupOp::SetEnd(number));
                    }
                    path.cursor = match group.repeat {
                        Repeat::Loop { .. } => Cursor::Iterate(group_id),
                        _ => Cursor::Leave(group_id),
                    };
                    stack.push(path);
                }
                Cursor::Leave(node) => {
                    let Some(parent) = self.ast.node(node).parent else {
                        continue;
                    };
                    path.cursor = match &self.ast.node(parent).kind {
                        NodeKind::Sequence(_) => match self.next_term[self.ast.node(node).id] {
                            Some(next) => Cursor::Enter(next),
                            None => Cursor::EndOfAlternative(parent),
                        },
                        kind => match kind.subtree_root() {
                            Some(root) => Cursor::Enter(root.match_found),
                            None => continue,
                        },
                    };
                    stack.push(path);
                }
            }
        }
        trace!("{} successors for {:?}", found.len(), start);
        Ok(found)
    }

    /// Push one path per alternative, so that the first alternative is popped first
    fn push_alternatives(
        &self,
        node: NodeId,
        group: &Group,
        path: PathState,
        stack: &mut Vec<PathState>,
    ) {
        for &alternative in group.alternatives.iter().rev() {
            let mut branch = path.clone();
            if let Some((first, last)) = group.clears {
                branch.ops.push(GroupOp::Clear(first, last));
            }
            if let Some(number) = group.capture {
                branch.ops.push(GroupOp::SetStart(number));
            }
            if group.empty_check {
                branch.entered.push(node);
            }
            branch.cursor = match self.ast.node(alternative).as_sequence() {
                Some([first, ..]) => Cursor::Enter(*first),
                _ => Cursor::EndOfAlternative(alternative),
            };
            stack.push(branch);
        }
    }
}
