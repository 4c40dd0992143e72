use huffstream::{decode_to_vec, encode_to_vec, FrequencyTable, HuffError, ENTRY_LEN, HEADER_LEN};

fn entries(container: &[u8]) -> Vec<(u8, u64)> {
    let count = usize::from(u16::from_le_bytes([container[1], container[2]]));
    container[HEADER_LEN..HEADER_LEN + count * ENTRY_LEN]
        .chunks(ENTRY_LEN)
        .map(|entry| {
            let mut bytes = [0; 8];
            bytes.copy_from_slice(&entry[1..]);
            (entry[0], u64::from_le_bytes(bytes))
        })
        .collect()
}

#[test]
fn empty_input() {
    let container = encode_to_vec(b"");
    assert_eq!(container, [&[0, 1, 0, b'a'][..], &[0; 8]].concat());
    assert_eq!(decode_to_vec(&container).unwrap(), b"");
}

#[test]
fn single_byte_input() {
    let container = encode_to_vec(b"?");
    assert_eq!(entries(&container), [(b'?', 1), (b'a', 0)]);
    // The sentinel weighs less and is the left child, `?` is coded as a single one bit.
    assert_eq!(container[0], 7);
    assert_eq!(container.len(), HEADER_LEN + 2 * ENTRY_LEN + 1);
    assert_eq!(container[container.len() - 1], 0b1);
}

#[test]
fn input_of_only_the_sentinel() {
    let container = encode_to_vec(b"aaa");
    assert_eq!(entries(&container), [(b'a', 3), (b'b', 0)]);
    assert_eq!(decode_to_vec(&container).unwrap(), b"aaa");
}

#[test]
fn counts_match_the_input() {
    let data = b"The quick brown fox jumps over lazy dog.";
    let container = encode_to_vec(data);

    let mut tally = [0u64; 256];
    for &byte in data.iter() {
        tally[usize::from(byte)] += 1;
    }
    let expected: Vec<(u8, u64)> = (0..=255u8)
        .filter(|&byte| tally[usize::from(byte)] > 0)
        .map(|byte| (byte, tally[usize::from(byte)]))
        .collect();

    let entry_count = u16::from_le_bytes([container[1], container[2]]);
    let entries = entries(&container);
    assert_eq!(usize::from(entry_count), expected.len());
    assert_eq!(entries, expected);
    assert_eq!(entries.iter().map(|e| e.1).sum::<u64>(), data.len() as u64);
    // Enough distinct bytes, no sentinel was added.
    assert_eq!(tally[usize::from(b'a')], 1);
}

#[test]
fn table_agrees_with_the_header() {
    let data = b"she sells sea shells by the sea shore";
    let container = encode_to_vec(data);
    let table = FrequencyTable::from_bytes(data);
    assert_eq!(entries(&container), table.iter().collect::<Vec<_>>());
    assert_eq!(HEADER_LEN + ENTRY_LEN * table.len(), table.header_len());
    assert!(container.len() > table.header_len());
}

#[test]
fn padding_is_in_range() {
    for len in 0..64 {
        let data: Vec<u8> = (0..len).map(|i| (i * 7 % 5) as u8).collect();
        let container = encode_to_vec(&data);
        assert!(container[0] <= 7);
        assert_eq!(decode_to_vec(&container).unwrap(), data);
    }
}

#[test]
fn runs_compress_well() {
    let data = vec![b'x'; 100_000];
    let container = encode_to_vec(&data);
    // One bit per byte plus the header.
    assert_eq!(container.len(), HEADER_LEN + 2 * ENTRY_LEN + 12_500);
    assert_eq!(container[0], 0);
}

#[test]
fn corrupted_input_is_rejected() {
    let status = decode_to_vec(b"#$36!#%!@&$*!@#4");
    assert_eq!(status, Err(HuffError::InvalidPadding(b'#')));
}

#[test]
fn truncated_container_is_rejected() {
    let data = b"she sells sea shells by the sea shore";
    let container = encode_to_vec(data);
    let header_len = HEADER_LEN + ENTRY_LEN * entries(&container).len();

    for cut in 0..header_len {
        let status = decode_to_vec(&container[..cut]);
        assert_eq!(status, Err(HuffError::TruncatedHeader), "cut at {}", cut);
    }

    // A cut body may still end on a code word boundary, it never yields the whole input.
    for cut in header_len..container.len() {
        match decode_to_vec(&container[..cut]) {
            Ok(decoded) => assert!(decoded.len() < data.len(), "cut at {}", cut),
            Err(err) => assert!(err.is_corruption(), "cut at {}", cut),
        }
    }
}

#[test]
fn empty_table_is_rejected() {
    assert_eq!(decode_to_vec(&[0, 0, 0]), Err(HuffError::EmptyTable));
    assert_eq!(decode_to_vec(&[0, 0, 0, 0xff]), Err(HuffError::EmptyTable));
}

#[test]
fn flipped_bits_never_panic() {
    let data = b"The quick brown fox jumps over lazy dog.";
    let container = encode_to_vec(data);

    for at in 0..container.len() {
        for bit in 0..8 {
            let mut corrupt = container.clone();
            corrupt[at] ^= 1 << bit;
            if let Err(err) = decode_to_vec(&corrupt) {
                assert!(err.is_corruption());
            }
        }
    }
}
