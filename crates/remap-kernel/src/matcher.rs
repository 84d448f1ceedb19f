//! Member name matching.
//!
//! A destination member name matches a source member when the two compare
//! equal ignoring case. Zero-argument methods named `GetX` are compared as
//! `X`. Members that cannot be read, and methods with required arguments,
//! never match anything.

use crate::descriptor::{MemberDescriptor, MemberKind};

/// Prefix stripped from zero-argument method names before comparison.
pub const GET_PREFIX: &str = "Get";

/// The name a source member is compared under, or `None` if the member is
/// not a candidate at all.
pub fn comparable_name(member: &MemberDescriptor) -> Option<&str> {
    if !member.is_source_candidate() {
        return None;
    }
    let name = member.name();
    if member.kind() == MemberKind::Method {
        if let Some(stripped) = name.strip_prefix(GET_PREFIX) {
            if !stripped.is_empty() {
                return Some(stripped);
            }
        }
    }
    Some(name)
}

/// Case-folded characters of `name`.
fn folded(name: &str) -> impl Iterator<Item = char> + '_ {
    name.chars().flat_map(char::to_lowercase)
}

/// Unicode case-insensitive equality.
pub fn names_equal(left: &str, right: &str) -> bool {
    folded(left).eq(folded(right))
}

/// Does `member` supply the destination member `destination`?
pub fn matches(destination: &str, member: &MemberDescriptor) -> bool {
    comparable_name(member).is_some_and(|name| names_equal(name, destination))
}

/// If `member`'s comparable name is a proper, case-insensitive prefix of
/// `destination`, return what remains of `destination` after it.
///
/// The prefix may differ from its counterpart in `destination` in byte
/// length, so the cut is found by walking `destination` one character at a
/// time. An empty name never strips anything.
pub fn strip_member_prefix<'d>(destination: &'d str, member: &MemberDescriptor) -> Option<&'d str> {
    let name = comparable_name(member)?;
    if name.is_empty() {
        return None;
    }
    let mut expected = folded(name).peekable();
    for (index, ch) in destination.char_indices() {
        if expected.peek().is_none() {
            return Some(&destination[index..]);
        }
        for lower in ch.to_lowercase() {
            if expected.next() != Some(lower) {
                return None;
            }
        }
    }
    None
}
