use regexdfa::parser::parse;
use regexdfa::{CompiledRegex, RegexFlags, RegexOptions, RegexSource, Utf16Input};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: {} <pattern> [flags] [input...]", args[0]);
        std::process::exit(2);
    }
    let pattern = &args[1];
    let flags = args.get(2).map(String::as_str).unwrap_or("");

    let regex = match CompiledRegex::new(pattern, flags) {
        Ok(regex) => regex,
        Err(e) => {
            println!("{e}");
            std::process::exit(1);
        }
    };
    println!("{}", regex.source());
    println!("  engine: {}", regex.engine_label());
    println!("  groups: {}", regex.group_count());
    for (name, number) in regex.group_names() {
        println!("    {name} -> {number}");
    }

    if let Ok(flags) = RegexFlags::parse(flags) {
        let source = RegexSource::new(pattern, flags);
        match parse(&source, &RegexOptions::default()) {
            Ok(ast) => println!(
                "  properties: {:?} ({} nodes)",
                ast.properties(),
                ast.live_nodes()
            ),
            Err(e) => println!("  properties: {e}"),
        }
    }

    if let Some(stats) = regex.statistics() {
        println!("  nfa states: {}", stats.nfa_states);
        println!("  forward dfa: {}", stats.forward_states);
        println!("  backward dfa: {}", stats.backward_states);
        println!("  capture group dfa: {}", stats.capture_group_states);
        println!("  trace finder dfa: {}", stats.trace_finder_states);
        println!("  lookaround dfas: {}", stats.lookaround_states);
        println!("  pre-calculated results: {}", stats.pre_calculated_results);
    }

    for text in args.iter().skip(3) {
        let input = Utf16Input::new(text);
        match regex.exec(&input, 0).captures() {
            Some(captures) => println!("  {text:?} -> {:?}", captures.as_slice()),
            None => println!("  {text:?} -> no match"),
        }
    }
}
