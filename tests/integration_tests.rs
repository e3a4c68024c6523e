//! Integration tests for the regex engine
//!
//! Expected results follow ECMAScript `RegExp.prototype.exec` semantics

use std::sync::Arc;

use regexdfa::{
    compile, compile_with_options, CompiledRegex, RegexCache, RegexError, RegexFlags,
    RegexOptions, RegexResult, RegexSource, Utf16Input,
};

fn exec(pattern: &str, flags: &str, text: &str, from: usize) -> RegexResult {
    compile(pattern, flags)
        .unwrap()
        .exec(&Utf16Input::new(text), from)
}

fn group(pattern: &str, flags: &str, text: &str, n: usize) -> Option<(usize, usize)> {
    exec(pattern, flags, text, 0).get(n)
}

#[test]
fn test_anchored_literal() {
    let regex = compile("^abc$", "").unwrap();
    assert_eq!(regex.exec(&Utf16Input::new("abc"), 0).get(0), Some((0, 3)));
    assert!(!regex.exec(&Utf16Input::new("xabc"), 0).is_match());
    assert!(!regex.exec(&Utf16Input::new("abcx"), 0).is_match());
}

#[test]
fn test_optional_group_does_not_participate() {
    let result = exec("(a)(b)?", "", "a", 0);
    assert_eq!(result.get(0), Some((0, 1)));
    assert_eq!(result.get(1), Some((0, 1)));
    assert_eq!(result.get(2), None);
    assert_eq!(result.captures().unwrap().as_slice(), &[0, 1, 0, 1, -1, -1]);
}

#[test]
fn test_counted_repetition_is_greedy_within_bound() {
    assert_eq!(group("a{2,4}", "", "aaaaa", 0), Some((0, 4)));
    assert_eq!(group("a{2,4}", "", "baab", 0), Some((1, 3)));
    assert_eq!(group("a{2,}", "", "aaaaa", 0), Some((0, 5)));
    assert_eq!(group("a{3}", "", "aaaa", 0), Some((0, 3)));
    assert!(!exec("a{2,4}", "", "aba", 0).is_match());
    assert_eq!(group("x{0}y", "", "xy", 0), Some((1, 2)));
}

#[cfg(feature = "fancy-fallback")]
#[test]
fn test_back_reference_uses_fallback() {
    let regex = compile(r"(a)\1", "").unwrap();
    assert_eq!(regex.engine_label(), "fallback:fancy-regex");
    let result = regex.exec(&Utf16Input::new("aa"), 0);
    assert_eq!(result.get(0), Some((0, 2)));
    assert_eq!(result.get(1), Some((0, 1)));
    assert!(!regex.exec(&Utf16Input::new("ab"), 0).is_match());
}

#[test]
fn test_back_reference_without_fallback_is_a_bailout() {
    let source = RegexSource::new(r"(a)\1", RegexFlags::empty());
    let error = compile_with_options(&source, RegexOptions::default(), None).unwrap_err();
    assert!(matches!(error, RegexError::Unsupported(_)));
}

#[test]
fn test_empty_pattern_on_empty_input() {
    assert_eq!(group("^(?:)$", "", "", 0), Some((0, 0)));
    assert_eq!(group("", "", "abc", 0), Some((0, 0)));
    assert_eq!(exec("", "", "abc", 3).get(0), Some((3, 3)));
    assert!(!exec("^(?:)$", "", "a", 0).is_match());
}

#[test]
fn test_from_index_past_end() {
    for pattern in ["", "a", "a*", "$", "(a)|b"] {
        let regex = compile(pattern, "").unwrap();
        assert!(!regex.exec(&Utf16Input::new("aa"), 3).is_match(), "{pattern}");
    }
    assert_eq!(exec("$", "", "aa", 2).get(0), Some((2, 2)));
    assert_eq!(exec("a*", "", "aa", 2).get(0), Some((2, 2)));
    assert!(!exec("a", "", "aa", 2).is_match());
}

#[test]
fn test_alternation_priority() {
    assert_eq!(group("a|ab", "", "ab", 0), Some((0, 1)));
    assert_eq!(group("ab|a", "", "ab", 0), Some((0, 2)));
    assert_eq!(group("b|ab", "", "ab", 0), Some((0, 2)));
    let result = exec("(a)|b", "", "b", 0);
    assert_eq!(result.get(0), Some((0, 1)));
    assert_eq!(result.get(1), None);
}

#[test]
fn test_lazy_quantifiers() {
    assert_eq!(group("a+?", "", "aaa", 0), Some((0, 1)));
    assert_eq!(group("<.*?>", "", "<a><b>", 0), Some((0, 3)));
    assert_eq!(group("<.*>", "", "<a><b>", 0), Some((0, 6)));
    assert_eq!(group("a??b", "", "ab", 0), Some((0, 2)));
}

#[test]
fn test_captures_in_loops() {
    let result = exec("(a|b)*c", "", "abac", 0);
    assert_eq!(result.get(0), Some((0, 4)));
    assert_eq!(result.get(1), Some((2, 3)));

    // captures are reset at the start of every iteration
    let result = exec("(?:(a)|b)+", "", "ab", 0);
    assert_eq!(result.get(0), Some((0, 2)));
    assert_eq!(result.get(1), None);

    // an iteration matching the empty string is rejected
    let result = exec("(a*)*b", "", "b", 0);
    assert_eq!(result.get(0), Some((0, 1)));
    assert_eq!(result.get(1), None);
}

#[test]
fn test_named_groups() {
    let regex = compile(r"(?<year>\d{4})-(?<month>\d\d)", "").unwrap();
    assert_eq!(regex.group_count(), 3);
    assert_eq!(regex.group_number("month"), Some(2));
    let result = regex.exec(&Utf16Input::new("on 2024-05"), 0);
    assert_eq!(result.get(0), Some((3, 10)));
    assert_eq!(result.get(1), Some((3, 7)));
    assert_eq!(result.get(2), Some((8, 10)));
}

#[test]
fn test_lookahead() {
    assert_eq!(group("a(?=b)", "", "acab", 0), Some((2, 3)));
    assert_eq!(group("a(?!b)", "", "abac", 0), Some((2, 3)));
    assert!(!exec("a(?=b)", "", "ac", 0).is_match());
    assert_eq!(group("(?=.*c)a", "", "abc", 0), Some((0, 1)));
}

#[test]
fn test_lookbehind() {
    assert_eq!(group(r"(?<=\$)\d+", "", "cost: $42", 0), Some((7, 9)));
    assert_eq!(group("(?<!a)b", "", "abcb", 0), Some((3, 4)));
    assert_eq!(group("(?<=^|,)x", "", "ax,x", 0), Some((3, 4)));
}

#[test]
fn test_anchors_and_multiline() {
    assert_eq!(group("^b", "m", "a\nb", 0), Some((2, 3)));
    assert!(!exec("^b", "", "a\nb", 0).is_match());
    assert_eq!(group("a$", "m", "a\nb", 0), Some((0, 1)));
    assert!(!exec("a$", "", "a\nb", 0).is_match());
    assert_eq!(group("^\\w+$", "m", "x\r\nyz", 0), Some((0, 1)));
    assert!(!exec("^a", "", "ba", 1).is_match());
}

#[test]
fn test_end_anchored_search() {
    assert_eq!(group("a+$", "", "aab aaa", 0), Some((4, 7)));
    assert_eq!(exec("a+$", "", "aab aaa", 5).get(0), Some((5, 7)));
    let result = exec("(a|b)+$", "", "xabab", 0);
    assert_eq!(result.get(0), Some((1, 5)));
    assert_eq!(result.get(1), Some((4, 5)));
}

#[test]
fn test_word_boundaries() {
    assert_eq!(group(r"\bfoo\b", "", "a foo.", 0), Some((2, 5)));
    assert!(!exec(r"\bfoo\b", "", "afoo", 0).is_match());
    assert_eq!(group(r"\Boo", "", "foo", 0), Some((1, 3)));
}

#[test]
fn test_sticky() {
    assert!(!exec("b", "y", "ab", 0).is_match());
    assert_eq!(exec("b", "y", "ab", 1).get(0), Some((1, 2)));
    assert!(!exec("[ab]c", "y", "xbc", 0).is_match());
    assert_eq!(exec("[ab]c", "y", "xbc", 1).get(0), Some((1, 3)));
    assert_eq!(exec("(a)|b", "y", "ba", 0).get(0), Some((0, 1)));
}

#[test]
fn test_ignore_case() {
    assert_eq!(group("[a-c]+", "i", "xAbC", 0), Some((1, 4)));
    assert_eq!(group("hello", "i", "say HeLLo", 0), Some((4, 9)));
    assert!(!exec("[^a]", "i", "A", 0).is_match());
}

#[test]
fn test_dot_and_dot_all() {
    assert!(!exec("a.b", "", "a\nb", 0).is_match());
    assert_eq!(group("a.b", "s", "a\nb", 0), Some((0, 3)));
    assert!(!exec("a.b", "", "a\u{2028}b", 0).is_match());
}

#[test]
fn test_unicode_mode_matches_code_points() {
    assert_eq!(group(".", "u", "\u{1F600}", 0), Some((0, 2)));
    assert_eq!(group(".", "", "\u{1F600}", 0), Some((0, 1)));
    assert!(exec("^.$", "u", "\u{1F600}", 0).is_match());
    assert!(!exec("^.$", "", "\u{1F600}", 0).is_match());
    assert_eq!(group("[\u{1F600}-\u{1F64F}]+", "u", "x\u{1F601}\u{1F602}", 0), Some((1, 5)));
    assert_eq!(group("\\u{61}", "u", "ba", 0), Some((1, 2)));
}

#[test]
fn test_character_class_escapes() {
    assert_eq!(group(r"\d+", "", "ab123", 0), Some((2, 5)));
    assert_eq!(group(r"[\s,]+", "", "a , b", 0), Some((1, 4)));
    assert_eq!(group(r"\W", "", "ab-c", 0), Some((2, 3)));
    assert_eq!(group(r"[^]", "", "\n", 0), Some((0, 1)));
    assert!(!exec("[]", "", "abc", 0).is_match());
}

#[test]
fn test_dead_pattern() {
    let regex = compile("a[]b", "").unwrap();
    assert_eq!(regex.engine_label(), "dead");
    assert!(!regex.is_match("ab"));
}

#[test]
fn test_syntax_errors() {
    let cases = [
        ("(a", "Unterminated group", 2),
        ("a)", "Unmatched ')'", 1),
        ("*a", "Nothing to repeat", 0),
        ("a{3,2}", "numbers out of order in {} quantifier", 1),
    ];
    for (pattern, message, position) in cases {
        assert_eq!(
            compile(pattern, "").unwrap_err(),
            RegexError::Syntax {
                message: message.to_string(),
                position
            },
            "{pattern}"
        );
    }
    assert!(matches!(compile("a", "x"), Err(RegexError::Syntax { .. })));
    assert!(matches!(compile("a", "gg"), Err(RegexError::Syntax { .. })));
}

#[test]
fn test_literal_and_general_pipeline_agree() {
    let source = RegexSource::new("^ab(c)", RegexFlags::empty());
    let literal = compile_with_options(&source, RegexOptions::default(), None).unwrap();
    let general = compile_with_options(
        &source,
        RegexOptions {
            literal_engine: false,
            ..RegexOptions::default()
        },
        None,
    )
    .unwrap();
    assert_eq!(literal.engine_label(), "literal:StartsWith");
    assert_eq!(general.engine_label(), "dfa");
    for text in ["abc", "xabc", "ab", "abcabc", ""] {
        for from in 0..=text.len() + 1 {
            let input = Utf16Input::new(text);
            assert_eq!(literal.exec(&input, from), general.exec(&input, from), "{text} {from}");
        }
    }
}

#[test]
fn test_compilation_is_idempotent() {
    let first = compile("(a+)(b|c)?", "").unwrap();
    let second = compile("(a+)(b|c)?", "").unwrap();
    for text in ["", "a", "ab", "xaac", "bbb"] {
        let input = Utf16Input::new(text);
        assert_eq!(first.exec(&input, 0), second.exec(&input, 0));
    }
}

#[test]
fn test_utf16_input() {
    let regex = CompiledRegex::new("b+", "").unwrap();
    let units: Vec<u16> = "abbc".encode_utf16().collect();
    assert_eq!(regex.exec(&units, 0).get(0), Some((1, 3)));
    assert_eq!(regex.exec(units.as_slice(), 2).get(0), Some((2, 3)));
    assert_eq!(regex.find("xbb"), Some((1, 3)));
}

#[cfg(feature = "fancy-fallback")]
#[test]
fn test_large_counted_repetition_falls_back() {
    let regex = compile("a{1000}", "").unwrap();
    assert!(regex.engine_label().starts_with("fallback"));
    assert!(!regex.is_match("aaa"));
    assert!(regex.is_match(&"a".repeat(1000)));
}

#[test]
fn test_cache_shares_compiled_patterns() {
    let cache = RegexCache::default();
    let first = cache.get_or_compile("(a|b)+", "").unwrap();
    let second = cache.get_or_compile("(a|b)+", "").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.exec(&Utf16Input::new("cab"), 0).get(1), Some((2, 3)));
}

#[test]
fn test_lone_surrogates_in_unicode_mode() {
    let lead: Vec<u16> = vec![0xD83D];
    let trail: Vec<u16> = vec![0xDE00];
    let pair: Vec<u16> = vec![0xD83D, 0xDE00];
    let dot = compile("^.$", "u").unwrap();
    assert_eq!(dot.exec(&lead, 0).get(0), Some((0, 1)));
    assert_eq!(dot.exec(&trail, 0).get(0), Some((0, 1)));
    assert_eq!(dot.exec(&pair, 0).get(0), Some((0, 2)));

    let lone_trail = compile(r"\uDE00", "u").unwrap();
    assert_eq!(lone_trail.exec(&trail, 0).get(0), Some((0, 1)));
    assert!(!lone_trail.exec(&pair, 0).is_match());
    let lone_lead = compile(r"\uD83D", "u").unwrap();
    assert_eq!(lone_lead.exec(&lead, 0).get(0), Some((0, 1)));
    assert!(!lone_lead.exec(&pair, 0).is_match());

    let negated = compile("[^a]", "u").unwrap();
    assert_eq!(negated.exec(&vec![0x61, 0xDE00], 0).get(0), Some((1, 2)));
    assert_eq!(negated.exec(&pair, 0).get(0), Some((0, 2)));
}

#[test]
fn test_unicode_search_starts_on_code_points() {
    let pair: Vec<u16> = vec![0xD83D, 0xDE00];
    assert_eq!(compile(".", "u").unwrap().exec(&pair, 1).get(0), Some((0, 2)));
    assert_eq!(group("(?!.)", "u", "\u{1F600}", 0), Some((2, 2)));
    assert_eq!(exec("(?!.)", "u", "\u{1F600}", 1).get(0), Some((2, 2)));
    assert_eq!(exec("", "u", "\u{1F600}", 1).get(0), Some((0, 0)));
    // without the u flag the trail unit is an ordinary position
    assert_eq!(exec(".", "", "\u{1F600}", 1).get(0), Some((1, 2)));
}

#[test]
fn test_word_boundaries_fold_in_unicode_ignore_case() {
    assert!(!exec(r"a\b", "iu", "a\u{212A}", 0).is_match());
    assert_eq!(group(r"a\B", "iu", "a\u{17F}", 0), Some((0, 1)));
    assert_eq!(group(r"a\b", "i", "a\u{212A}", 0), Some((0, 1)));
    assert_eq!(group(r"\w", "iu", "-\u{212A}", 0), Some((1, 2)));
    assert!(!exec(r"\W", "iu", "\u{17F}", 0).is_match());
}

#[cfg(feature = "fancy-fallback")]
#[test]
fn test_property_escape_in_class_uses_fallback() {
    let regex = compile(r"[\p{L}]", "u").unwrap();
    assert!(regex.engine_label().starts_with("fallback"));
    assert_eq!(regex.find("a"), Some((0, 1)));
    let negated = compile(r"[^\p{L}\d]", "u").unwrap();
    assert_eq!(negated.find("a1-"), Some((2, 3)));
}

#[test]
fn test_property_escape_without_fallback_is_a_bailout() {
    let source = RegexSource::new(r"[\p{L}]", RegexFlags::parse("u").unwrap());
    let error = compile_with_options(&source, RegexOptions::default(), None).unwrap_err();
    assert!(matches!(error, RegexError::Unsupported(_)));
}

#[cfg(feature = "fancy-fallback")]
#[test]
fn test_back_reference_to_unset_group() {
    assert_eq!(group(r"(a)|\1b", "", "b", 0), Some((0, 1)));
    assert_eq!(group(r"\1(a)", "", "a", 0), Some((0, 1)));
    assert_eq!(group(r"(a)?\1b", "", "b", 0), Some((0, 1)));
    assert_eq!(group(r"\k<n>(?<n>a)", "", "a", 0), Some((0, 1)));
}

#[cfg(feature = "fancy-fallback")]
#[test]
fn test_named_reference_escape_without_named_groups() {
    assert_eq!(group(r"(a)\k<n>", "", "ak<n>", 0), Some((0, 5)));
}

#[cfg(feature = "fancy-fallback")]
#[test]
fn test_back_reference_compares_code_units() {
    assert!(!exec(r"(.)\1", "", "\u{1F600}\u{1F600}", 0).is_match());
    assert_eq!(group(r"(.)\1", "u", "\u{1F600}\u{1F600}", 0), Some((0, 4)));
    let regex = compile(r"(.)\1", "").unwrap();
    assert!(!regex.exec(&vec![0xD800u16, 0xD801], 0).is_match());
    assert_eq!(regex.exec(&vec![0xDC00u16, 0xDC00], 0).get(0), Some((0, 2)));
}
