//! Lint schema definition files: tab indentation, one field per line,
//! attributes before elements, no trailing whitespace.
//!
//! Usage:
//!   lint_schemas [OPTIONS] [FILE.msgs ...]
//!   lint_schemas < catalog.msgs
//!
//! Given files, the linter rewrites them to satisfy the mechanical rules
//! (fix), then reports anything left. With stdin it lints only, unless --fix
//! prints the fixed source to stdout.
//!
//! Options:
//!   --fix, -f    With stdin: print fixed source to stdout.
//!   --human, -H  Human-readable output.

use adminmsg::lint::{lint, lint_fix, LintMessage, Severity};
use std::io::{self, Read, Write};
use std::path::Path;

#[derive(Clone, Copy)]
enum OutputStyle {
    Compact,
    Human,
}

fn print_message(path: &str, m: &LintMessage, style: OutputStyle) {
    let severity = match m.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    match style {
        OutputStyle::Compact => {
            println!("{}:{}: {}: {} [{}]", path, m.line, severity, m.message, m.rule.id());
        }
        OutputStyle::Human => {
            println!("  {} line {}: {}", path, m.line, m.message);
            println!("    rule: {}", m.rule.id());
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let fix = if let Some(pos) = args.iter().position(|a| a == "--fix" || a == "-f") {
        args.remove(pos);
        true
    } else {
        false
    };
    let style = if let Some(pos) = args.iter().position(|a| a == "--human" || a == "-H") {
        args.remove(pos);
        OutputStyle::Human
    } else {
        OutputStyle::Compact
    };

    let mut has_error = false;
    let mut total_errors = 0usize;
    let mut total_warnings = 0usize;
    let mut count = |messages: &[LintMessage]| {
        for m in messages {
            match m.severity {
                Severity::Error => total_errors += 1,
                Severity::Warning => total_warnings += 1,
            }
        }
    };

    if args.is_empty() {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        if fix {
            io::stdout().write_all(lint_fix(&src).as_bytes())?;
            return Ok(());
        }
        let messages = lint(&src);
        count(&messages);
        for m in &messages {
            print_message("<stdin>", m, style);
        }
        has_error = messages.iter().any(|m| m.severity == Severity::Error);
    } else {
        for path in &args {
            let path = Path::new(path);
            let src = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    has_error = true;
                    continue;
                }
            };
            let fixed = lint_fix(&src);
            if fixed != src {
                if let Err(e) = std::fs::write(path, &fixed) {
                    eprintln!("{}: write failed: {}", path.display(), e);
                    has_error = true;
                    continue;
                }
                eprintln!("{}: fixed", path.display());
            }
            let messages = lint(&fixed);
            count(&messages);
            for m in &messages {
                print_message(&path.display().to_string(), m, style);
            }
            if messages.iter().any(|m| m.severity == Severity::Error) {
                has_error = true;
            }
        }
    }

    if total_errors > 0 || total_warnings > 0 {
        eprintln!("lint: {} error(s), {} warning(s)", total_errors, total_warnings);
    }
    if has_error {
        std::process::exit(1);
    }
    Ok(())
}
