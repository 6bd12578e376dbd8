use indexmap::IndexMap;

use qb_core::ident::IdentifierName;
use qb_core::{Identifier, QbResult};

use crate::primitive::ByteReader;

/// Resolves 16-bit name offsets against the header-resident name region
/// (§4.2), caching each decoded identifier so repeat lookups are O(1) and
/// observably identical to the first resolution. Backed by an [`IndexMap`]
/// so [`NameTable::snapshot`] hands back names in first-resolved order
/// rather than arbitrary hash order.
pub struct NameTable {
    header_size: u64,
    cache: IndexMap<u16, Identifier>,
}

impl NameTable {
    pub fn new(header_size: u64) -> Self {
        NameTable {
            header_size,
            cache: IndexMap::new(),
        }
    }

    /// Resolve `offset` into an [`Identifier`], seeking into the name region
    /// and restoring the reader's prior position before returning.
    ///
    /// Callers are responsible for recognizing the sentinel offsets
    /// `0xFFFE`/`0xFFFF` before calling this — they do not denote name-table
    /// entries at all at the call sites that use them (§4.2).
    pub fn resolve(&mut self, reader: &mut ByteReader<'_>, offset: u16) -> QbResult<Identifier> {
        if let Some(cached) = self.cache.get(&offset) {
            return Ok(cached.clone());
        }

        let saved = reader.tell();
        reader.seek(self.header_size + offset as u64 + 2);
        let flags = reader.read_u8()?;
        let length = reader.read_u8()?;
        let name = if (flags & 0x02) != 0 && length == 2 {
            IdentifierName::Numeric(reader.read_u16()? as u32)
        } else {
            IdentifierName::Text(reader.read_bytes(length as usize)?)
        };
        reader.seek(saved);

        let identifier = Identifier {
            name,
            offset,
            suffix: None,
        };
        self.cache.insert(offset, identifier.clone());
        Ok(identifier)
    }

    /// Insert an identifier created without a backing name-table record
    /// (e.g. a synthesized numeric label), so it participates in later
    /// de-duplication the same way a resolved one would.
    pub fn insert(&mut self, identifier: Identifier) {
        self.cache.insert(identifier.offset, identifier);
    }

    /// Every identifier resolved so far, keyed by its name-table offset and
    /// in first-resolved order, for attaching to the decoded
    /// [`qb_syntax::File`] once parsing finishes.
    pub fn snapshot(&self) -> IndexMap<u16, Identifier> {
        self.cache.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with_name(header_size: usize, offset: u16, flags: u8, length: u8, body: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; header_size + offset as usize + 2];
        data.push(flags);
        data.push(length);
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn resolves_textual_name() {
        let data = file_with_name(0x1C, 0x00, 0x00, 5, b"COUNT");
        let mut reader = ByteReader::new(&data);
        let mut table = NameTable::new(0x1C);
        let id = table.resolve(&mut reader, 0x00).unwrap();
        assert_eq!(id.display(), "COUNT");
    }

    #[test]
    fn resolves_numeric_label() {
        let data = file_with_name(0x1C, 0x10, 0x02, 2, &[0x0A, 0x00]);
        let mut reader = ByteReader::new(&data);
        let mut table = NameTable::new(0x1C);
        let id = table.resolve(&mut reader, 0x10).unwrap();
        assert_eq!(id.display(), "10");
    }

    #[test]
    fn second_lookup_is_cached_and_identical() {
        let data = file_with_name(0x1C, 0x00, 0x00, 1, b"X");
        let mut reader = ByteReader::new(&data);
        let mut table = NameTable::new(0x1C);
        let first = table.resolve(&mut reader, 0x00).unwrap();
        let second = table.resolve(&mut reader, 0x00).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn resolve_restores_reader_position() {
        let data = file_with_name(0x1C, 0x00, 0x00, 1, b"X");
        let mut reader = ByteReader::new(&data);
        reader.seek(5);
        let mut table = NameTable::new(0x1C);
        table.resolve(&mut reader, 0x00).unwrap();
        assert_eq!(reader.tell(), 5);
    }
}
