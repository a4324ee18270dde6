use std::io::{self, IsTerminal, Write};

use nu_ansi_term::Color;

use crate::EngineError;

/// Pretty-print an [`EngineError`], with caret positioning when it points at an instruction.
/// If `program` is `Some("jbf")`, messages are prefixed with "jbf: ...".
pub fn print_engine_error(program: Option<&str>, code: &str, err: &EngineError) {
    let msg = match err {
        EngineError::PointerOutOfBounds { ptr, op, .. } => {
            format!("Runtime error: pointer out of bounds (ptr={ptr}, op={op})")
        }
        EngineError::UnmatchedBracket { kind, .. } => {
            format!("Runtime error: unmatched bracket {kind}")
        }
        other => format!("Error: {other}"),
    };
    let msg = match program {
        Some(p) => format!("{p}: {msg}"),
        None => msg,
    };

    match err.ip() {
        Some(ip) => print_error_with_context(&msg, code, ip),
        None => {
            eprintln!("{}", styled_header(&msg));
            let _ = io::stderr().flush();
        }
    }
}

/// Print a concise error with instruction index and a caret context window,
/// working with UTF-8 by slicing using char indices.
pub fn print_error_with_context(prefix: &str, code: &str, pos: usize) {
    eprintln!("{} at instruction {pos}", styled_header(prefix));
    for line in context_lines(code, pos) {
        eprintln!("  {line}");
    }
    let _ = io::stderr().flush();
}

/// The source window around `pos` and a caret line under it.
fn context_lines(code: &str, pos: usize) -> [String; 2] {
    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let total_chars = code.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    // Newlines would break the caret alignment
    let slice: String = code
        .chars()
        .skip(start_char)
        .take(end_char.saturating_sub(start_char))
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect();

    let caret_offset_chars = pos.saturating_sub(start_char);
    let underline = format!("{}^", " ".repeat(caret_offset_chars));

    [slice, underline]
}

// Red only when a human is watching stderr; keep pipelines clean otherwise.
fn styled_header(msg: &str) -> String {
    if io::stderr().is_terminal() {
        Color::Red.bold().paint(msg).to_string()
    } else {
        msg.to_string()
    }
}
