//! Fuzz target for the canonical hash encoding.
//!
//! Any JSON value the node accepts must encode without panicking, and the
//! encoding must decode back to an equal value.

#![no_main]

use libfuzzer_sys::fuzz_target;
use proofchain_consensus::to_canonical_json;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let encoded = to_canonical_json(&value).expect("value should encode");
    let decoded: serde_json::Value =
        serde_json::from_str(&encoded).expect("canonical form should be valid JSON");
    assert_eq!(decoded, value);
});
