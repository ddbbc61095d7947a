//! `CharPtr` — a non-owning value pointing at an externally-owned C string
//! (§4.4). Comparable and hashable exactly as if it were an owned
//! `SeqStr`; the type tag fed into the hash stream is the string type tag
//! so a `CharPtr` key can find an entry inserted as an owned `SeqStr`.

use crate::hash::HashContext;
use crate::string::SeqStr;

/// Which width the external buffer is encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharPtrKind {
    /// Narrow (Latin-1-ish) bytes, one byte per code point.
    Narrow,
    /// UTF-8 bytes.
    Utf8,
    /// UTF-32 code points, native endianness.
    Utf32,
}

/// A borrowed view of an externally-owned string. The lifetime parameter
/// ties the value to whatever owns the backing buffer; this crate never
/// stores a `CharPtr` past the lifetime of its source the way the raw-
/// pointer C original could, trading a little flexibility for memory
/// safety without unsafe code at this layer.
#[derive(Debug, Clone, Copy)]
pub struct CharPtr<'a> {
    kind: CharPtrKind,
    narrow_or_utf8: &'a [u8],
    utf32: &'a [u32],
}

impl<'a> CharPtr<'a> {
    pub fn narrow(bytes: &'a [u8]) -> Self {
        CharPtr {
            kind: CharPtrKind::Narrow,
            narrow_or_utf8: bytes,
            utf32: &[],
        }
    }

    pub fn utf8(bytes: &'a [u8]) -> Self {
        CharPtr {
            kind: CharPtrKind::Utf8,
            narrow_or_utf8: bytes,
            utf32: &[],
        }
    }

    pub fn utf32(codepoints: &'a [u32]) -> Self {
        CharPtr {
            kind: CharPtrKind::Utf32,
            narrow_or_utf8: &[],
            utf32: codepoints,
        }
    }

    pub fn kind(&self) -> CharPtrKind {
        self.kind
    }

    /// Lazily iterate code points without materializing a `String`.
    pub fn chars(&self) -> Box<dyn Iterator<Item = u32> + 'a> {
        match self.kind {
            CharPtrKind::Narrow => Box::new(self.narrow_or_utf8.iter().map(|&b| b as u32)),
            CharPtrKind::Utf8 => {
                // Reuse std's decoder; a genuinely invalid sequence is a
                // contract violation by the caller (external buffer claimed
                // to be UTF-8), so lossy replacement keeps this infallible
                // rather than threading a Result through every comparison.
                let s = String::from_utf8_lossy(self.narrow_or_utf8);
                Box::new(s.chars().collect::<Vec<_>>().into_iter().map(|c| c as u32))
            }
            CharPtrKind::Utf32 => Box::new(self.utf32.iter().copied()),
        }
    }

    pub fn len(&self) -> usize {
        self.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        match self.kind {
            CharPtrKind::Narrow | CharPtrKind::Utf8 => self.narrow_or_utf8.is_empty(),
            CharPtrKind::Utf32 => self.utf32.is_empty(),
        }
    }

    /// Equality against an owned string, code point by code point —
    /// matches whatever `equal` does for two owned `SeqStr`s.
    pub fn equal_str(&self, other: &SeqStr) -> bool {
        self.len() == other.char_len() && self.chars().eq(other.chars())
    }

    pub fn equal(&self, other: &CharPtr) -> bool {
        self.len() == other.len() && self.chars().eq(other.chars())
    }

    /// Materialize into an owned string (heap or embedded, chosen
    /// adaptively the same way any other string construction is).
    pub fn to_owned_string(&self) -> SeqStr {
        SeqStr::from_chars(self.chars())
    }

    /// Hash identically to an equal owned `SeqStr` — the type tag is the
    /// string tag, not a distinct `CharPtr` tag, by design (§4.4).
    pub fn hash(&self, ctx: &mut HashContext) {
        ctx.feed_u64(crate::typereg::UwTypeId::STRING.0 as u64);
        for cp in self.chars() {
            ctx.feed_u64(cp as u64);
        }
        ctx.feed_u64(self.len() as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_chars() {
        let p = CharPtr::narrow(b"abc");
        assert_eq!(p.chars().collect::<Vec<_>>(), vec![97, 98, 99]);
    }

    #[test]
    fn utf8_chars() {
        let p = CharPtr::utf8("héllo".as_bytes());
        let owned = p.to_owned_string();
        assert_eq!(owned.to_string(), "héllo");
    }

    #[test]
    fn utf32_chars() {
        let cps = [0x1F980u32]; // crab emoji
        let p = CharPtr::utf32(&cps);
        assert_eq!(p.len(), 1);
        assert_eq!(p.chars().next(), Some(0x1F980));
    }

    #[test]
    fn equal_against_owned_string() {
        let p = CharPtr::utf8(b"hello");
        let s = SeqStr::from_str("hello");
        assert!(p.equal_str(&s));
        let s2 = SeqStr::from_str("world");
        assert!(!p.equal_str(&s2));
    }

    #[test]
    fn hash_matches_equal_owned_string() {
        let p = CharPtr::utf8(b"hash me");
        let s = SeqStr::from_str("hash me");
        let mut ctx1 = HashContext::init();
        p.hash(&mut ctx1);
        let mut ctx2 = HashContext::init();
        s.hash(&mut ctx2);
        assert_eq!(ctx1.finish(), ctx2.finish());
    }
}
