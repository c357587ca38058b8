//! Fuzz target for peer chain responses.
//!
//! Decodes arbitrary bytes as a `{chain, length}` response and runs both
//! validator modes over whatever decodes. Neither step may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use proofchain_consensus::{ChainValidator, PeerChain, ProofOfWork};

fuzz_target!(|data: &[u8]| {
    let Ok(response) = serde_json::from_slice::<PeerChain>(data) else {
        return;
    };

    // Low difficulty so the fuzzer can actually reach the proof check.
    let pow = ProofOfWork::new(1);
    let strict = ChainValidator::new(pow).validate(&response.chain);
    let loose = ChainValidator::loose(pow).validate(&response.chain);

    // Strict mode only adds checks.
    assert!(strict.is_err() || loose.is_ok());

    for block in &response.chain {
        let _ = block.hash();
    }
});
