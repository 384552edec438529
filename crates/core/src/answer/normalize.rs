//! Canonical form for free-text answers.
//!
//! Learners type `2 × π`, `2*pi` or `2\times\pi` for the same thing. Both the
//! submission and every accepted answer are pushed through [`normalize`] and
//! compared as plain strings afterwards.

use std::fmt::Write as _;

/// Unicode math glyphs and the ASCII tokens they stand for.
const GLYPHS: &[(char, &str)] = &[
    ('×', "*"),
    ('÷', "/"),
    ('−', "-"),
    ('π', "pi"),
    ('√', "sqrt"),
    ('≤', "<="),
    ('≥', ">="),
    ('≠', "!="),
    ('≈', "~="),
];

/// LaTeX commands that carry meaning; every other `\command` is dropped.
///
/// Matched as prefixes of the letter run, since whitespace is already gone
/// and `\times x` arrives as `\timesx`.
const COMMANDS: &[(&str, &str)] = &[("pi", "pi"), ("times", "*"), ("div", "/")];

const FRAC: &str = "\\frac";
const SQRT: &str = "\\sqrt";

/// Canonicalizes an answer for equivalence comparison.
///
/// Deterministic, idempotent and total: `normalize(normalize(s)) == normalize(s)`
/// for every input.
#[must_use]
pub fn normalize(input: &str) -> String {
    let compact: String = input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let ascii = translate_glyphs(&compact);
    let fractions = rewrite_fractions(&ascii);
    let roots = rewrite_roots(&fractions);
    let commands = rewrite_commands(&roots);

    commands.chars().filter(|c| !matches!(c, '{' | '}')).collect()
}

fn translate_glyphs(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match GLYPHS.iter().find(|(glyph, _)| *glyph == ch) {
            Some((_, token)) => out.push_str(token),
            None => out.push(ch),
        }
    }
    out
}

/// Reads a `{...}` group starting at byte `start`, honouring nested braces.
///
/// Returns the inner text and the byte index just past the closing brace.
fn brace_group(input: &str, start: usize) -> Option<(&str, usize)> {
    let rest = input.get(start..)?;
    if !rest.starts_with('{') {
        return None;
    }
    let mut depth = 0_usize;
    for (offset, ch) in rest.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&rest[1..offset], start + offset + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// `\frac{A}{B}` becomes `(A)/(B)`.
fn rewrite_fractions(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(FRAC) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + FRAC.len()..];
        let parts = brace_group(after, 0)
            .and_then(|(num, end)| brace_group(after, end).map(|(den, end)| (num, den, end)));
        match parts {
            Some((num, den, end)) => {
                let _ = write!(
                    out,
                    "({})/({})",
                    rewrite_fractions(num),
                    rewrite_fractions(den)
                );
                rest = &after[end..];
            }
            None => {
                // Malformed; the command stripper removes it later.
                out.push_str(FRAC);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// `\sqrt{A}` becomes `sqrt(A)`, a bare `\sqrt` becomes `sqrt`.
fn rewrite_roots(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(SQRT) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + SQRT.len()..];
        match brace_group(after, 0) {
            Some((radicand, end)) => {
                let _ = write!(out, "sqrt({})", rewrite_roots(radicand));
                rest = &after[end..];
            }
            None => {
                out.push_str("sqrt");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Maps the known commands to tokens and drops every other backslash.
fn rewrite_commands(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let mut name = String::new();
        while let Some(next) = chars.peek().copied() {
            if !next.is_ascii_alphabetic() {
                break;
            }
            name.push(next);
            chars.next();
        }
        let known = COMMANDS
            .iter()
            .find_map(|(command, token)| name.strip_prefix(command).map(|tail| (*token, tail)));
        if let Some((token, tail)) = known {
            out.push_str(token);
            out.push_str(tail);
        }
    }
    out
}
