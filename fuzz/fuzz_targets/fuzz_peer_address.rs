//! Fuzz target for peer address parsing.
//!
//! A parsed address must re-parse to itself from its display form.

#![no_main]

use libfuzzer_sys::fuzz_target;
use proofchain_consensus::PeerAddress;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    if let Ok(peer) = PeerAddress::parse(&input) {
        let reparsed = PeerAddress::parse(&peer.to_string())
            .expect("normalized address should parse");
        assert_eq!(reparsed, peer);
    }
});
