//! Escape handling for commands and argument values pulled out of definition files.
//!
//! Source commands are run through three named steps:
//!
//! 1. [`escape_control`] renders the text as a single escaped line: backslashes are
//!    doubled and control characters become `\n`, `\t`, `\r`, `\a` or `\xNN`.
//! 2. [`repair_bell`] rewrites the mis-encoded bell escape `\x07` to its letter
//!    form `\a`. Upstream definitions sometimes spell the bell character this way.
//! 3. [`unescape`] turns the escaped line back into text.
//!
//! Commands go through all three ([`normalize_command`]). Argument defaults stop
//! after step 2 ([`normalize_argument`]) so ledger values stay on one line.

use std::fmt::Write as _;

const BELL: char = '\u{7}';

/// Render `raw` as a single line with backslashes and control characters escaped.
pub fn escape_control(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            BELL => out.push_str("\\x07"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\x{:02x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out
}

/// Rewrite every `\x07` escape in an escaped line to `\a`.
///
/// Only escapes are touched: a doubled backslash followed by `x07` is a literal
/// backslash in the source and its `x07` suffix is repaired the same way, which
/// keeps literal `\x07` text in a command in step with a real bell character.
pub fn repair_bell(escaped: &str) -> String {
    escaped.replace("\\x07", "\\a")
}

/// Decode an escaped line produced by [`escape_control`] back into text.
///
/// Unknown escapes are kept verbatim.
pub fn unescape(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('a') => out.push(BELL),
            Some('x') => {
                let hex: String = chars.clone().take(2).collect();
                let valid = hex.len() == 2 && hex.chars().all(|c| c.is_ascii_hexdigit());
                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) if valid => {
                        chars.next();
                        chars.next();
                        out.push(char::from(byte));
                    }
                    _ => out.push_str("\\x"),
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// The original command as recorded in the ledger and used for deduplication.
pub fn normalize_command(raw: &str) -> String {
    unescape(&repair_bell(&escape_control(raw)))
}

/// Ledger form of an argument default: escaped, bell-repaired, single line.
pub fn normalize_argument(raw: &str) -> String {
    repair_bell(&escape_control(raw))
}
