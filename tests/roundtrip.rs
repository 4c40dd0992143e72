use huffstream::{decode, encode, Configuration};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::io::Cursor;
use test_case::test_case;

fn shifting_bytes() -> Vec<u8> {
    (0..1usize << 16).map(|i| (i + (i >> 8)) as u8).collect()
}

fn all_bytes() -> Vec<u8> {
    (0..=255u8).collect()
}

#[test_case(b"" ; "empty")]
#[test_case(b"?" ; "single byte")]
#[test_case(b"aaaaaaaa" ; "only the sentinel")]
#[test_case(b"bbbbbbbbbbbbbbbbbbbbbbbb" ; "one repeated byte")]
#[test_case(b"The quick brown fox jumps over lazy dog." ; "sentence")]
#[test_case("Съешь же ещё этих мягких французских булок, да выпей чаю.".as_bytes() ; "cyrillic")]
#[test_case("Voyez le brick géant que j'examine près du wharf.".as_bytes() ; "accented")]
fn roundtrips(data: &[u8]) {
    assert_roundtrips(data);
}

#[test]
fn roundtrip_all_bytes() {
    assert_roundtrips(&all_bytes());
}

#[test]
fn roundtrip_shifting_bytes() {
    assert_roundtrips(&shifting_bytes());
}

#[test]
fn roundtrip_random() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    for len in [1, 2, 9, 100, 4097, 100_000] {
        let mut data = vec![0; len];
        rng.fill_bytes(&mut data);
        assert_roundtrips(&data);

        // Skewed distributions give long code words.
        let skewed: Vec<u8> = data.iter().map(|b| b.leading_zeros() as u8).collect();
        assert_roundtrips(&skewed);
    }
}

#[test]
fn output_is_deterministic() {
    let data = shifting_bytes();
    let first = huffstream::encode_to_vec(&data);
    let second = huffstream::encode_to_vec(&data);
    assert_eq!(first, second);
}

#[test]
fn encoder_can_be_reused() {
    let data = b"one container after the other";
    let mut encoder = encode::Encoder::new();

    let mut first = vec![];
    encoder.into_vec(&mut first).encode_all(data).status.unwrap();
    let mut second = vec![];
    encoder.into_vec(&mut second).encode_all(data).status.unwrap();
    assert_eq!(first, second);

    let mut decoder = decode::Decoder::new();
    let mut compare = vec![];
    decoder.into_vec(&mut compare).decode_all(&second).status.unwrap();
    assert_eq!(compare, data);

    decoder.reset();
    compare.clear();
    decoder.into_vec(&mut compare).decode_all(&first).status.unwrap();
    assert_eq!(compare, data);
}

fn assert_roundtrips(data: &[u8]) {
    // The stream interface seeks back to write the padding count.
    let mut encoder = encode::Encoder::new();
    let mut buffer = Cursor::new(Vec::with_capacity(data.len() + 40));
    let result = encoder
        .into_stream(&mut buffer)
        .encode_all(Cursor::new(data));
    assert!(result.status.is_ok(), "{:?}", result.status);
    assert_eq!(result.bytes_read, data.len());
    let buffer = buffer.into_inner();
    assert_eq!(result.bytes_written, buffer.len());
    assert_eq!(buffer, huffstream::encode_to_vec(data));

    let mut decoder = Configuration::new().with_chunk_size(4096).build_decoder();
    let mut compare = vec![];
    let result = decoder
        .into_stream(&mut compare)
        .decode_all(buffer.as_slice());
    assert!(result.status.is_ok(), "{:?}", result.status);
    assert_eq!(result.bytes_read, buffer.len());
    assert!(data == &*compare, "roundtrip of {} bytes", data.len());
}
