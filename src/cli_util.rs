use std::io::{self, IsTerminal, Write};

use nu_ansi_term::{Color, Style};

use crate::EngineError;

/// Show a short window of this many characters on either side of the error.
const WINDOW_CHARS: usize = 32;

/// Pretty-print an [`EngineError`] with caret positioning.
/// If `program` is `Some("tapebf")`, messages are prefixed with "tapebf: ...".
/// Colors are used only when stderr is a terminal.
pub fn print_engine_error(program: Option<&str>, code: &str, err: &EngineError) {
    let color = io::stderr().is_terminal();
    eprint!("{}", render_engine_error(program, code, err, color));
    let _ = io::stderr().flush();
}

/// Build the text printed by [`print_engine_error`].
pub fn render_engine_error(program: Option<&str>, code: &str, err: &EngineError, color: bool) -> String {
    let msg = match err {
        EngineError::UnmatchedBracket { kind, .. } => format!("Runtime error: unmatched bracket {kind}"),
        EngineError::Trace { source, .. } => format!("Trace error: {source}"),
        EngineError::StepLimitExceeded { .. } | EngineError::Canceled => err.to_string(),
    };
    let msg = match program {
        Some(p) => format!("{p}: {msg}"),
        None => msg,
    };

    match err.ip() {
        Some(ip) => render_error_with_context(&msg, code, ip, color),
        None => format!("{msg}\n"),
    }
}

/// Render a concise error with instruction index and a caret context window,
/// working with UTF-8 by slicing using char indices.
pub fn render_error_with_context(prefix: &str, code: &str, pos: usize, color: bool) -> String {
    let total_chars = code.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    let slice: String = code.chars().skip(start_char).take(end_char.saturating_sub(start_char)).collect();
    let underline = format!("{}^", " ".repeat(pos.saturating_sub(start_char)));

    let (headline, caret) = if color {
        (
            Style::new().bold().paint(format!("{prefix} at instruction {pos}")).to_string(),
            Color::Red.bold().paint(underline).to_string(),
        )
    } else {
        (format!("{prefix} at instruction {pos}"), underline)
    };

    format!("{headline}\n  {slice}\n  {caret}\n")
}
