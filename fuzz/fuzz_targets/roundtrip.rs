#![no_main]
use huffstream::{decode, encode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut encoder = encode::Encoder::new();
    let mut buffer = Vec::with_capacity(data.len() + 40);
    let result = encoder.into_vec(&mut buffer).encode_all(data);
    assert!(result.status.is_ok(), "{:?}", result.status);

    let mut decoder = decode::Decoder::new();
    let mut compare = vec![];
    let result = decoder.into_stream(&mut compare).decode_all(buffer.as_slice());
    assert!(result.status.is_ok(), "{:?}", result.status);
    assert_eq!(data, &*compare);
});
