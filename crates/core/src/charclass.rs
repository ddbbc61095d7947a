//! Character-classification predicate set (§6.3).
//!
//! Out of scope per the purpose statement: "the ICU-backed
//! character-classification bridge (abstracted as a whitespace/lowercase/
//! uppercase predicate set)". `string.rs`'s `trim`/`lower`/`upper`
//! operations are written against the `CharClass` trait below rather than
//! a hardcoded ASCII table, so a consumer can swap in a Unicode-aware
//! implementation without touching string internals. The default impl
//! shipped here is ASCII-only, which is enough for this crate's own tests.
pub trait CharClass: Send + Sync {
    fn is_space(&self, cp: u32) -> bool;
    fn to_lower(&self, cp: u32) -> u32;
    fn to_upper(&self, cp: u32) -> u32;
}

/// ASCII-only predicate set. Anything outside `0..=0x7F` passes through
/// `to_lower`/`to_upper` unchanged and is never considered space.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsciiCharClass;

impl CharClass for AsciiCharClass {
    fn is_space(&self, cp: u32) -> bool {
        matches!(cp, 0x20 | 0x09 | 0x0A | 0x0B | 0x0C | 0x0D)
    }

    fn to_lower(&self, cp: u32) -> u32 {
        if (0x41..=0x5A).contains(&cp) {
            cp + 0x20
        } else {
            cp
        }
    }

    fn to_upper(&self, cp: u32) -> u32 {
        if (0x61..=0x7A).contains(&cp) {
            cp - 0x20
        } else {
            cp
        }
    }
}

/// Unicode-aware predicate set built on `char`'s own classification, for
/// consumers that don't need to link the ICU bridge the original source
/// uses but still want more than ASCII.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeCharClass;

impl CharClass for UnicodeCharClass {
    fn is_space(&self, cp: u32) -> bool {
        char::from_u32(cp).is_some_and(|c| c.is_whitespace())
    }

    fn to_lower(&self, cp: u32) -> u32 {
        match char::from_u32(cp) {
            Some(c) => c.to_lowercase().next().map(|c| c as u32).unwrap_or(cp),
            None => cp,
        }
    }

    fn to_upper(&self, cp: u32) -> u32 {
        match char::from_u32(cp) {
            Some(c) => c.to_uppercase().next().map(|c| c as u32).unwrap_or(cp),
            None => cp,
        }
    }
}
