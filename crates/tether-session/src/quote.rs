//! Quoting values for the remote POSIX shell.

/// Wrap `s` in single quotes for a POSIX shell.
///
/// Each embedded `'` becomes `'\''`: close the quote, emit an escaped
/// quote, reopen. The result is always exactly one shell word, whatever
/// metacharacters `s` contains.
#[must_use]
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str(r"'\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

/// Protect a trailing `;` from tmux.
///
/// tmux reads an argument ending in `;` as a command separator and turns a
/// trailing `\;` into a literal `;`, so one backslash goes before the final
/// semicolon and nothing else changes.
#[must_use]
pub fn tmux_literal(text: &str) -> String {
    match text.strip_suffix(';') {
        Some(head) => format!("{head}\\;"),
        None => text.to_string(),
    }
}
