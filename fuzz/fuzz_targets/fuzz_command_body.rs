#![no_main]

use axum::body::Bytes;
use libfuzzer_sys::fuzz_target;
use robogate::server::handlers::decode_args;

// Request bodies are caller-controlled; decoding must never panic, and only
// a JSON object can produce a non-empty argument bag.
fuzz_target!(|data: &[u8]| {
    let body = Bytes::copy_from_slice(data);
    let args = decode_args(&body);
    if !args.is_empty() {
        let first = data.iter().find(|b| !b.is_ascii_whitespace());
        assert_eq!(first, Some(&b'{'));
    }
});
