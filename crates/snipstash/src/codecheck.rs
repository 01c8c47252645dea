// Lightweight code checks for snippets.
//
// A line scanner, not a parser: counts brackets, flags likely unterminated
// strings, and collects lint-style notes. Useful for warning a user before
// they save or publish; never an authority on syntax.

use serde::{Deserialize, Serialize};

/// A single observation, anchored to a 1-based line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeNote {
    pub line: usize,
    pub message: String,
}

/// The report for one piece of code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeReport {
    /// Echoed back from the request; the checks themselves are
    /// language-agnostic.
    pub language: String,
    pub line_count: usize,
    pub char_count: usize,
    pub longest_line: usize,
    /// Whether `()`, `[]`, and `{}` all close in order. String contents are
    /// not excluded, so a bracket inside a literal counts.
    pub balanced: bool,
    pub todo_count: usize,
    pub notes: Vec<CodeNote>,
}

/// Run the line checks over a piece of code.
pub fn check_code(code: &str, language: &str) -> CodeReport {
    let trailing_ws = regex::Regex::new(r"[ \t]+$").unwrap();
    let mixed_indent = regex::Regex::new(r"^( +\t|\t+ )").unwrap();
    let todo_marker = regex::Regex::new(r"(?i)\b(todo|fixme)\b").unwrap();

    let mut notes = Vec::new();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut balanced = true;
    let mut line_count = 0;
    let mut longest_line = 0;

    for (idx, line) in code.lines().enumerate() {
        let line_no = idx + 1;
        line_count += 1;
        longest_line = longest_line.max(line.chars().count());

        for ch in line.chars() {
            match ch {
                '(' => stack.push((')', line_no)),
                '[' => stack.push((']', line_no)),
                '{' => stack.push(('}', line_no)),
                ')' | ']' | '}' => match stack.pop() {
                    Some((expected, _)) if expected == ch => {}
                    _ => {
                        // Only the first mismatch gets a note; everything
                        // after it is usually cascade
                        if balanced {
                            notes.push(CodeNote {
                                line: line_no,
                                message: format!("Unmatched '{}'", ch),
                            });
                        }
                        balanced = false;
                    }
                },
                _ => {}
            }
        }

        if unescaped_quote_count(line) % 2 != 0 {
            notes.push(CodeNote {
                line: line_no,
                message: "Possibly unterminated string literal".to_string(),
            });
        }
        if trailing_ws.is_match(line) {
            notes.push(CodeNote {
                line: line_no,
                message: "Trailing whitespace".to_string(),
            });
        }
        if mixed_indent.is_match(line) {
            notes.push(CodeNote {
                line: line_no,
                message: "Mixed tabs and spaces in indentation".to_string(),
            });
        }
    }

    for (closer, line) in stack.drain(..) {
        balanced = false;
        notes.push(CodeNote {
            line,
            message: format!("Unclosed bracket, expected '{}'", closer),
        });
    }

    CodeReport {
        language: language.to_string(),
        line_count,
        char_count: code.chars().count(),
        longest_line,
        balanced,
        todo_count: todo_marker.find_iter(code).count(),
        notes,
    }
}

/// Count double quotes on a line, skipping backslash-escaped ones.
fn unescaped_quote_count(line: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for ch in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => count += 1,
            _ => {}
        }
    }
    count
}
