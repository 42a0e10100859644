use std::sync::OnceLock;

use regex::Regex;
use tracing::info_span;

use crate::ir::Statement;

const INDENT: &str = "    ";

/// Renders a statement list as Python source, one line per leaf, ending with a newline unless
/// there is nothing to render.
pub fn render(statements: &[Statement]) -> String {
    let _span = info_span!("render").entered();

    let mut lines = vec![];
    render_into(&mut lines, statements, 0);
    if lines.is_empty() {
        return String::new();
    }
    let mut output = lines.join("\n");
    output.push('\n');

    merge_adjacent_literals(&output)
}

/// Joins string literals written next to each other with `+`, like `'a' + 'b'`, into one
/// literal. Only single-quoted literals outside of other literals and comments are joined.
fn merge_adjacent_literals(output: &str) -> String {
    static LEXEMES: OnceLock<Regex> = OnceLock::new();
    let lexemes = LEXEMES.get_or_init(|| {
        Regex::new(r#"'(?:[^'\\\n]|\\.)*'|"(?:[^"\\\n]|\\.)*"|#.*"#)
            .expect("literal pattern must be valid")
    });

    let mut merged = String::with_capacity(output.len());
    let mut copied = 0;
    let mut after_literal = false;
    for lexeme in lexemes.find_iter(output) {
        let gap = &output[copied..lexeme.start()];
        let text = lexeme.as_str();
        let literal = text.starts_with('\'');
        if literal && after_literal && !gap.contains('\n') && gap.trim() == "+" {
            // Drop the closing quote of the previous literal and the opening one of this.
            merged.pop();
            merged.push_str(&text[1..]);
        } else {
            merged.push_str(gap);
            merged.push_str(text);
        }
        after_literal = literal;
        copied = lexeme.end();
    }
    merged.push_str(&output[copied..]);
    merged
}

fn render_into(lines: &mut Vec<String>, statements: &[Statement], depth: usize) {
    for statement in statements {
        match statement {
            Statement::Line(line) => lines.push(format!("{}{line}", INDENT.repeat(depth))),
            Statement::Blank => lines.push(String::new()),
            Statement::Block(block) => render_into(lines, block, depth + 1),
        }
    }
}
