//! Property-based test generators using proptest.
//!
//! Provides strategies for subjects, correlation tokens, frame bodies and
//! header values, both well-formed and deliberately malformed.

use bytes::Bytes;
use proptest::prelude::*;

/// Strategy for generating valid publish subjects.
pub fn subject_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::string::string_regex("[a-zA-Z0-9_-]{1,12}").expect("Invalid regex"),
        1..5,
    )
    .prop_map(|tokens| tokens.join("."))
}

/// Strategy for generating correlation tokens.
pub fn uid_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9]{1,40}").expect("Invalid regex")
}

/// Strategy for generating a frame body.
pub fn payload_strategy() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..512).prop_map(Bytes::from)
}

/// Strategy for generating the bodies of a whole stream.
pub fn stream_strategy(max_frames: usize) -> impl Strategy<Value = Vec<Bytes>> {
    prop::collection::vec(payload_strategy(), 0..=max_frames)
}

/// Strategy for generating sequence header values that must be rejected.
pub fn malformed_sequence_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        any::<u32>().prop_map(|n| format!("+{n}")),
        any::<u32>().prop_map(|n| format!("-{n}")),
        any::<u32>().prop_map(|n| format!(" {n}")),
        any::<u32>().prop_map(|n| format!("{n} ")),
        any::<u32>().prop_map(|n| format!("{n}.0")),
        prop::string::string_regex("[a-zA-Z][a-zA-Z0-9]{0,8}").expect("Invalid regex"),
        Just("18446744073709551616".to_string()),
    ]
}

/// Strategy for generating the different spellings a peer may use for a
/// header name: canonical or alias, in any letter case.
pub fn header_spelling_strategy(
    canonical: &'static str,
    alias: &'static str,
) -> impl Strategy<Value = String> {
    (
        prop_oneof![Just(canonical), Just(alias)],
        prop::collection::vec(any::<bool>(), 32),
    )
        .prop_map(|(name, upper)| {
            name.chars()
                .zip(upper)
                .map(|(c, up)| {
                    if up {
                        c.to_ascii_uppercase()
                    } else {
                        c.to_ascii_lowercase()
                    }
                })
                .collect()
        })
}
