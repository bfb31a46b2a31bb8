//! The `%` token registry.
//!
//! Every token maps to a [`TokenKind`]; [`resolve`] turns a kind plus its
//! optional `{N}` parameter into text. Resolution never fails: a token that
//! cannot produce a value (no word list for `%rf`) yields the empty string.

use crate::context::NameContext;
use chrono::{Datelike, Timelike};
use rand::Rng;

/// `0-9A-Za-z`.
pub const ALPHANUMERIC: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Alphanumerics without look-alikes (`0/O`, `1/l/I`).
pub const BASE56: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz";

pub const HEXADECIMAL: &[u8] = b"0123456789ABCDEF";

const LOWER_BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Upper bound for `{N}` on repeat and padding parameters.
pub const MAX_REPEAT: u32 = 1024;

/// Token prefix.
pub const PREFIX: char = '%';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Year,
    Year2,
    Month,
    MonthName,
    MonthNameShort,
    WeekdayName,
    WeekdayNameShort,
    WeekOfYear,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    AmPm,
    UnixTimestamp,
    Increment,
    IncrementBase36,
    IncrementBase62,
    IncrementBase,
    IncrementHex,
    RandomDigits,
    RandomAlphanumeric,
    RandomNonAmbiguous,
    RandomHex,
    Guid,
    RandomLine,
    NewLine,
}

/// Token ids, longest first so a prefix scan finds the longest match.
const TOKENS: &[(&str, TokenKind)] = &[
    ("unix", TokenKind::UnixTimestamp),
    ("mon2", TokenKind::MonthNameShort),
    ("guid", TokenKind::Guid),
    ("mon", TokenKind::MonthName),
    ("iAa", TokenKind::IncrementBase62),
    ("rna", TokenKind::RandomNonAmbiguous),
    ("yy", TokenKind::Year2),
    ("mo", TokenKind::Month),
    ("w2", TokenKind::WeekdayNameShort),
    ("wy", TokenKind::WeekOfYear),
    ("mi", TokenKind::Minute),
    ("ms", TokenKind::Millisecond),
    ("pm", TokenKind::AmPm),
    ("ia", TokenKind::IncrementBase36),
    ("ib", TokenKind::IncrementBase),
    ("ix", TokenKind::IncrementHex),
    ("rn", TokenKind::RandomDigits),
    ("ra", TokenKind::RandomAlphanumeric),
    ("rx", TokenKind::RandomHex),
    ("rf", TokenKind::RandomLine),
    ("y", TokenKind::Year),
    ("w", TokenKind::WeekdayName),
    ("d", TokenKind::Day),
    ("h", TokenKind::Hour),
    ("s", TokenKind::Second),
    ("i", TokenKind::Increment),
    ("n", TokenKind::NewLine),
];

impl TokenKind {
    /// The id written after `%`.
    pub fn id(self) -> &'static str {
        TOKENS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(id, _)| *id)
            .unwrap_or_default()
    }

    /// Look up a token by its exact id.
    pub fn from_id(id: &str) -> Option<Self> {
        TOKENS
            .iter()
            .find(|(name, _)| *name == id)
            .map(|(_, kind)| *kind)
    }

    /// Find the longest token id that `input` starts with.
    ///
    /// Returns the kind and the byte length of the id.
    pub fn longest_prefix(input: &str) -> Option<(Self, usize)> {
        TOKENS
            .iter()
            .find(|(name, _)| input.starts_with(name))
            .map(|(name, kind)| (*kind, name.len()))
    }

    /// All registered ids.
    pub fn ids() -> impl Iterator<Item = &'static str> {
        TOKENS.iter().map(|(id, _)| *id)
    }

    fn counter_key(self) -> Option<&'static str> {
        match self {
            TokenKind::Increment
            | TokenKind::IncrementBase36
            | TokenKind::IncrementBase62
            | TokenKind::IncrementBase
            | TokenKind::IncrementHex => Some(self.id()),
            _ => None,
        }
    }
}

/// Resolve a token id. Unknown ids resolve to the empty string.
pub fn resolve_id(id: &str, parameter: Option<u32>, ctx: &mut NameContext) -> String {
    TokenKind::from_id(id)
        .map(|kind| resolve(kind, parameter, ctx))
        .unwrap_or_default()
}

/// Produce the value of `kind`.
///
/// `parameter` is the `{N}` suffix: zero-padding width for counters, the base
/// for `%ib`, and the length for random tokens.
pub fn resolve(kind: TokenKind, parameter: Option<u32>, ctx: &mut NameContext) -> String {
    let now = ctx.now();
    match kind {
        TokenKind::Year => format!("{:04}", now.year()),
        TokenKind::Year2 => format!("{:02}", now.year().rem_euclid(100)),
        TokenKind::Month => format!("{:02}", now.month()),
        TokenKind::MonthName => now.format("%B").to_string(),
        TokenKind::MonthNameShort => now.format("%b").to_string(),
        TokenKind::WeekdayName => now.format("%A").to_string(),
        TokenKind::WeekdayNameShort => now.format("%a").to_string(),
        TokenKind::WeekOfYear => format!("{:02}", now.iso_week().week()),
        TokenKind::Day => format!("{:02}", now.day()),
        TokenKind::Hour => format!("{:02}", now.hour()),
        TokenKind::Minute => format!("{:02}", now.minute()),
        TokenKind::Second => format!("{:02}", now.second()),
        TokenKind::Millisecond => format!("{:03}", now.timestamp_subsec_millis().min(999)),
        TokenKind::AmPm => (if now.hour() < 12 { "AM" } else { "PM" }).to_string(),
        TokenKind::UnixTimestamp => now.timestamp().to_string(),
        TokenKind::Increment
        | TokenKind::IncrementBase36
        | TokenKind::IncrementBase62
        | TokenKind::IncrementBase
        | TokenKind::IncrementHex => resolve_counter(kind, parameter, ctx),
        TokenKind::RandomDigits => random_string(ctx, b"0123456789", parameter),
        TokenKind::RandomAlphanumeric => random_string(ctx, ALPHANUMERIC, parameter),
        TokenKind::RandomNonAmbiguous => random_string(ctx, BASE56, parameter),
        TokenKind::RandomHex => random_string(ctx, HEXADECIMAL, parameter),
        TokenKind::Guid => {
            let mut bytes = [0u8; 16];
            ctx.rng().fill_bytes(&mut bytes);
            uuid::Builder::from_random_bytes(bytes)
                .into_uuid()
                .to_string()
        }
        TokenKind::RandomLine => random_line(ctx),
        TokenKind::NewLine => "\n".to_string(),
    }
}

fn resolve_counter(kind: TokenKind, parameter: Option<u32>, ctx: &mut NameContext) -> String {
    let Some(key) = kind.counter_key() else {
        return String::new();
    };
    let value = ctx.counters().next(key);
    match kind {
        TokenKind::IncrementBase => {
            let base = parameter.unwrap_or(36).clamp(2, 62);
            to_base(value, &ALPHANUMERIC[..base as usize])
        }
        _ => {
            let digits = match kind {
                TokenKind::IncrementBase36 => to_base(value, LOWER_BASE36),
                TokenKind::IncrementBase62 => to_base(value, ALPHANUMERIC),
                TokenKind::IncrementHex => to_base(value, HEXADECIMAL),
                _ => value.to_string(),
            };
            let width = parameter.unwrap_or(0).min(MAX_REPEAT) as usize;
            format!("{digits:0>width$}")
        }
    }
}

/// Render `value` with `alphabet`, whose length is the base.
pub fn to_base(mut value: u64, alphabet: &[u8]) -> String {
    let base = alphabet.len() as u64;
    if base < 2 {
        return String::new();
    }
    if value == 0 {
        return (alphabet[0] as char).to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(alphabet[(value % base) as usize]);
        value /= base;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn random_string(ctx: &mut NameContext, alphabet: &[u8], parameter: Option<u32>) -> String {
    let len = parameter.unwrap_or(1).clamp(1, MAX_REPEAT);
    let rng = ctx.rng();
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

fn random_line(ctx: &mut NameContext) -> String {
    let len = match ctx.word_list() {
        Some(words) if !words.is_empty() => words.len(),
        _ => return String::new(),
    };
    let index = ctx.rng().gen_range(0..len);
    ctx.word_list()
        .and_then(|words| words.get(index))
        .map(|word| word.trim().to_string())
        .unwrap_or_default()
}
