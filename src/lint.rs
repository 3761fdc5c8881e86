//! Linter for schema definition files: enforces catalog style rules.
//!
//! ## Rules
//!
//! - **Indentation**: one tab per depth level, no spaces. Depth follows `{`/`}`.
//! - **One field per line**: at most one `;`-terminated declaration per line.
//! - **Closing brace alone**: `}` must not share a line with a declaration.
//! - **No trailing whitespace**.
//! - **Attributes first**: within a section, `@`-fields come before element
//!   fields, matching the wire layout.
//!
//! Run via the `lint_schemas` binary: `lint_schemas catalog.msgs` or pipe
//! stdin. Exit code 1 if any error-level findings.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Identifies which rule produced the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintRule {
    IndentationTabsOnly,
    IndentationDepth,
    OneFieldPerLine,
    ClosingBraceAlone,
    NoTrailingWhitespace,
    AttributesFirst,
}

impl LintRule {
    pub fn id(self) -> &'static str {
        match self {
            LintRule::IndentationTabsOnly => "indentation-tabs-only",
            LintRule::IndentationDepth => "indentation-depth",
            LintRule::OneFieldPerLine => "one-field-per-line",
            LintRule::ClosingBraceAlone => "closing-brace-alone",
            LintRule::NoTrailingWhitespace => "no-trailing-whitespace",
            LintRule::AttributesFirst => "attributes-first",
        }
    }
}

/// A single lint finding with location.
#[derive(Debug, Clone)]
pub struct LintMessage {
    pub line: usize,
    pub rule: LintRule,
    pub severity: Severity,
    pub message: String,
}

fn strip_line_comment(line: &str) -> &str {
    match line.find("//") {
        Some(i) => line[..i].trim_end(),
        None => line,
    }
}

/// Run all rules on definition source. Findings come back in line order.
pub fn lint(source: &str) -> Vec<LintMessage> {
    let mut out = Vec::new();
    let mut depth: i32 = 0;
    let mut seen_element_field = false;

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;

        if line != line.trim_end() {
            out.push(LintMessage {
                line: line_no,
                rule: LintRule::NoTrailingWhitespace,
                severity: Severity::Warning,
                message: "trailing whitespace not allowed".to_string(),
            });
        }

        let trimmed = line.trim_start();
        let leading = &line[..line.len() - trimmed.len()];

        if leading.contains(' ') {
            out.push(LintMessage {
                line: line_no,
                rule: LintRule::IndentationTabsOnly,
                severity: Severity::Error,
                message: "indent with tabs, not spaces".to_string(),
            });
        }

        let content = strip_line_comment(trimmed);

        if !trimmed.is_empty() && !trimmed.starts_with("//") && !trimmed.starts_with("/*") {
            let tabs = leading.chars().filter(|&c| c == '\t').count();
            // A closing line sits one level out.
            let expected = if content.starts_with('}') {
                (depth - 1).max(0) as usize
            } else {
                depth.max(0) as usize
            };
            if tabs != expected {
                out.push(LintMessage {
                    line: line_no,
                    rule: LintRule::IndentationDepth,
                    severity: Severity::Error,
                    message: format!("expected {} tab(s), found {}", expected, tabs),
                });
            }
        }

        let semicolons = content.matches(';').count();
        if semicolons > 1 {
            out.push(LintMessage {
                line: line_no,
                rule: LintRule::OneFieldPerLine,
                severity: Severity::Error,
                message: format!("one declaration per line (found {})", semicolons),
            });
        }

        if content.contains('}') && content.contains(';') {
            out.push(LintMessage {
                line: line_no,
                rule: LintRule::ClosingBraceAlone,
                severity: Severity::Warning,
                message: "closing `}` should stand alone".to_string(),
            });
        }

        // Attribute ordering inside a section body.
        if depth > 0 && content.ends_with(';') {
            if content.starts_with('@') {
                if seen_element_field {
                    out.push(LintMessage {
                        line: line_no,
                        rule: LintRule::AttributesFirst,
                        severity: Severity::Warning,
                        message: "declare attributes before element fields".to_string(),
                    });
                }
            } else if !content.starts_with("namespace") {
                seen_element_field = true;
            }
        }

        for c in content.chars() {
            match c {
                '{' => {
                    depth += 1;
                    seen_element_field = false;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
    }

    out
}

/// Rewrite source to satisfy the mechanical rules: tab indentation by depth,
/// one declaration per line, closing brace alone, no trailing whitespace.
/// Field ordering is left to the author.
pub fn lint_fix(source: &str) -> String {
    let mut depth: i32 = 0;
    let mut out = Vec::new();

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            out.push(String::new());
            continue;
        }
        // Preserve comment-only lines at the current depth.
        if trimmed.starts_with("//") || trimmed.starts_with("/*") {
            out.push(format!("{}{}", "\t".repeat(depth.max(0) as usize), trimmed));
            continue;
        }

        let comment = trimmed.find("//").map(|i| trimmed[i..].to_string());
        let code = strip_line_comment(trimmed);

        // Break the line into statements and brace tokens.
        let mut pieces: Vec<String> = Vec::new();
        let mut current = String::new();
        for c in code.chars() {
            match c {
                ';' => {
                    current.push(';');
                    pieces.push(current.trim().to_string());
                    current = String::new();
                }
                '}' => {
                    if !current.trim().is_empty() {
                        pieces.push(current.trim().to_string());
                    }
                    pieces.push("}".to_string());
                    current = String::new();
                }
                _ => current.push(c),
            }
        }
        if !current.trim().is_empty() {
            pieces.push(current.trim().to_string());
        }

        let last = pieces.len().saturating_sub(1);
        for (i, piece) in pieces.iter().enumerate() {
            let this_depth = if piece == "}" { depth - 1 } else { depth };
            let indent = "\t".repeat(this_depth.max(0) as usize);
            let suffix = match (&comment, i == last) {
                (Some(c), true) => format!(" {}", c),
                _ => String::new(),
            };
            out.push(format!("{}{}{}", indent, piece, suffix));
            for c in piece.chars() {
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
            }
        }
    }

    let mut fixed = out.join("\n");
    fixed.push('\n');
    fixed
}
