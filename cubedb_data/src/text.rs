//! Validation of wire-visible strings.
//!
//! Every string the server echoes back travels as a raw line fragment, so
//! nothing with control characters (newlines in particular) may ever enter
//! the store.

/// Returns true when `s` consists solely of printable ASCII, space included.
///
/// The empty string is clean; emptiness is a per-argument rule, not a
/// character rule.
pub fn is_clean_text(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7e).contains(&b))
}
