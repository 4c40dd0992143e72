//! Byte frequencies and their serialized form in the container header.
use crate::error::HuffError;
use crate::{ENTRY_LEN, HEADER_LEN, SENTINEL, SENTINEL_ALT};

/// Occurrence counts of byte values.
///
/// Iteration is always in ascending byte order, which is also the order of entries in the
/// container header. A byte that never occurred has no entry at all, while the sentinel may
/// have an entry with a count of zero.
#[derive(Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [Option<u64>; 256],
}

impl FrequencyTable {
    /// Create a table without any entries.
    pub fn new() -> Self {
        FrequencyTable { counts: [None; 256] }
    }

    /// Count all bytes of `data` and seal the table.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut table = FrequencyTable::new();
        table.count(data);
        table.seal();
        table
    }

    /// Add the bytes of one input chunk.
    pub fn count(&mut self, data: &[u8]) {
        for &byte in data {
            let count = self.counts[usize::from(byte)].get_or_insert(0);
            *count += 1;
        }
    }

    /// Ensure the table can yield a code for every counted byte.
    ///
    /// With fewer than two distinct bytes the sentinel is added with a count of zero. Should
    /// the only byte be the sentinel itself, the alternate sentinel is added instead. An empty
    /// input thus results in a single entry, any other input in at least two.
    pub fn seal(&mut self) {
        if self.len() >= 2 {
            return;
        }

        let filler = if self.get(SENTINEL).is_some() {
            SENTINEL_ALT
        } else {
            SENTINEL
        };
        self.counts[usize::from(filler)] = Some(0);
    }

    /// Set the count of a byte, replacing a previous entry.
    pub fn insert(&mut self, byte: u8, count: u64) {
        self.counts[usize::from(byte)] = Some(count);
    }

    /// The count of a byte, if it has an entry.
    pub fn get(&self, byte: u8) -> Option<u64> {
        self.counts[usize::from(byte)]
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.counts.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(Option::is_none)
    }

    /// Iterate over `(byte, count)` entries in ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        (0..=u8::MAX)
            .zip(self.counts.iter())
            .filter_map(|(byte, count)| count.map(|count| (byte, count)))
    }

    /// The sum of all counts, which is the number of symbols in the body.
    pub fn total(&self) -> u64 {
        self.iter().fold(0u64, |acc, (_, count)| acc.saturating_add(count))
    }

    /// The length of the header that describes this table.
    pub fn header_len(&self) -> usize {
        HEADER_LEN + ENTRY_LEN * self.len()
    }

    /// Append the container header to `into`.
    pub(crate) fn write_header(&self, padding: u8, into: &mut Vec<u8>) {
        into.reserve(self.header_len());
        into.push(padding);
        // At most 256 entries, always fits.
        into.extend_from_slice(&(self.len() as u16).to_le_bytes());
        for (byte, count) in self.iter() {
            into.push(byte);
            into.extend_from_slice(&count.to_le_bytes());
        }
    }

    /// Rebuild a table from the serialized entries following the entry count.
    ///
    /// A later entry for the same byte replaces an earlier one.
    pub(crate) fn read_entries(entries: &[u8]) -> Result<Self, HuffError> {
        if entries.len() % ENTRY_LEN != 0 {
            return Err(HuffError::TruncatedHeader);
        }

        let mut table = FrequencyTable::new();
        for entry in entries.chunks_exact(ENTRY_LEN) {
            let mut count = [0; 8];
            count.copy_from_slice(&entry[1..]);
            table.insert(entry[0], u64::from_le_bytes(count));
        }

        if table.is_empty() {
            return Err(HuffError::EmptyTable);
        }

        Ok(table)
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        FrequencyTable::new()
    }
}

impl core::fmt::Debug for FrequencyTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
