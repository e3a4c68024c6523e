//! Randomized comparisons of the DFA pipeline against a backtracking engine

use proptest::prelude::*;

use regexdfa::{compile, compile_with_options, RegexFlags, RegexOptions, RegexSource, Utf16Input};

/// Pattern text over `{a, b}` plus whether it can match the empty string.
///
/// Quantified bodies are never nullable: ECMAScript rejects iterations that match the empty
/// string, the reference engine accepts them.
fn pattern() -> impl Strategy<Value = (String, bool)> {
    let leaf = prop_oneof![
        Just(("a".to_string(), false)),
        Just(("b".to_string(), false)),
        Just(("[ab]".to_string(), false)),
        Just((".".to_string(), false)),
        Just(("".to_string(), true)),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|((x, xn), (y, yn))| (x + &y, xn && yn)),
            (inner.clone(), inner.clone())
                .prop_map(|((x, xn), (y, yn))| (format!("(?:{x}|{y})"), xn || yn)),
            inner.clone().prop_map(|(x, n)| (format!("({x})"), n)),
            inner
                .clone()
                .prop_filter("nullable optional body", |(_, n)| !n)
                .prop_map(|(x, _)| (format!("(?:{x})?"), true)),
            inner
                .clone()
                .prop_filter("nullable optional body", |(_, n)| !n)
                .prop_map(|(x, _)| (format!("(?:{x})??"), true)),
            inner
                .clone()
                .prop_filter("nullable loop body", |(_, n)| !n)
                .prop_map(|(x, _)| (format!("(?:{x})*"), true)),
            inner
                .clone()
                .prop_filter("nullable loop body", |(_, n)| !n)
                .prop_map(|(x, _)| (format!("(?:{x})+?"), false)),
            inner
                .prop_filter("nullable loop body", |(_, n)| !n)
                .prop_map(|(x, _)| (format!("(?:{x}){{1,3}}"), false)),
        ]
    })
}

/// Patterns without loops, where group contents never depend on iteration history
fn loop_free_pattern() -> impl Strategy<Value = (String, bool)> {
    let leaf = prop_oneof![
        Just(("a".to_string(), false)),
        Just(("b".to_string(), false)),
        Just(("[ab]".to_string(), false)),
        Just((".".to_string(), false)),
        Just(("".to_string(), true)),
    ];
    leaf.prop_recursive(4, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|((x, xn), (y, yn))| (x + &y, xn && yn)),
            (inner.clone(), inner.clone())
                .prop_map(|((x, xn), (y, yn))| (format!("(?:{x}|{y})"), xn || yn)),
            (inner.clone(), inner.clone())
                .prop_map(|((x, xn), (y, yn))| (format!("({x}|{y})"), xn || yn)),
            inner.clone().prop_map(|(x, n)| (format!("({x})"), n)),
            inner
                .clone()
                .prop_filter("nullable optional body", |(_, n)| !n)
                .prop_map(|(x, _)| (format!("({x})?"), true)),
            inner
                .prop_filter("nullable optional body", |(_, n)| !n)
                .prop_map(|(x, _)| (format!("({x})??"), true)),
        ]
    })
}

fn anchored_pattern() -> impl Strategy<Value = String> {
    (any::<bool>(), pattern(), any::<bool>()).prop_map(|(caret, (body, _), dollar)| {
        format!(
            "{}{body}{}",
            if caret { "^" } else { "" },
            if dollar { "$" } else { "" }
        )
    })
}

proptest! {
    #[test]
    fn test_match_bounds_agree_with_backtracking(
        pattern in anchored_pattern(),
        text in "[ab]{0,8}",
    ) {
        let regex = compile(&pattern, "").unwrap();
        let reference = fancy_regex::Regex::new(&pattern).unwrap();
        let input = Utf16Input::new(&text);
        for from in 0..=text.len() {
            let expected = reference
                .find_from_pos(&text, from)
                .unwrap()
                .map(|m| (m.start(), m.end()));
            prop_assert_eq!(regex.exec(&input, from).get(0), expected, "{} on {:?} from {}", pattern, text, from);
        }
    }

    #[test]
    fn test_literal_engine_agrees_with_automata(
        literal in "[ab]{0,3}",
        caret in any::<bool>(),
        dollar in any::<bool>(),
        sticky in any::<bool>(),
        text in "[ab]{0,6}",
    ) {
        let pattern = format!(
            "{}{literal}{}",
            if caret { "^" } else { "" },
            if dollar { "$" } else { "" }
        );
        let flags = if sticky { RegexFlags::STICKY } else { RegexFlags::empty() };
        let source = RegexSource::new(&pattern, flags);
        let fast = compile_with_options(&source, RegexOptions::default(), None).unwrap();
        let slow = compile_with_options(
            &source,
            RegexOptions { literal_engine: false, ..RegexOptions::default() },
            None,
        )
        .unwrap();
        prop_assert!(fast.engine_label().starts_with("literal:"));
        prop_assert_eq!(slow.engine_label(), "dfa");
        let input = Utf16Input::new(&text);
        for from in 0..=text.len() + 1 {
            prop_assert_eq!(fast.exec(&input, from), slow.exec(&input, from), "{} on {:?} from {}", pattern, text, from);
        }
    }

    #[test]
    fn test_captures_agree_with_backtracking(
        (pattern, _) in loop_free_pattern(),
        text in "[ab]{0,6}",
    ) {
        let regex = compile(&pattern, "").unwrap();
        let reference = fancy_regex::Regex::new(&pattern).unwrap();
        let input = Utf16Input::new(&text);
        for from in 0..=text.len() {
            let result = regex.exec(&input, from);
            let expected = reference.captures_from_pos(&text, from).unwrap();
            prop_assert_eq!(result.is_match(), expected.is_some(), "{} on {:?} from {}", pattern, text, from);
            let Some(expected) = expected else { continue };
            for group in 0..reference.captures_len() {
                let bounds = expected.get(group).map(|m| (m.start(), m.end()));
                prop_assert_eq!(result.get(group), bounds, "group {} of {} on {:?} from {}", group, pattern, text, from);
            }
        }
    }
}
