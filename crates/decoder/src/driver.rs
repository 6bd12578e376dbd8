//! The file driver (§4.6): recognizes the version stamp, selects the
//! matching dialect, decodes the header and (VBDOS) its attached form
//! resource, decodes the main opcode stream, and iterates the trailing
//! `SUB`/`FUNCTION` procedure records. Owns the one exception-to-partial-
//! output rule in §4.4/§7: a failure anywhere in the main stream or a
//! procedure stream stops further decoding but keeps everything already
//! built.

use qb_core::{Identifier, QbError, QbResult};
use qb_reader::{ByteReader, NameTable};
use qb_syntax::{File, ProcKind, Procedure};

use crate::context::ParseContext;
use crate::dialect::{unpack, Dialect, UnpackedOpcode};
use crate::forms;
use crate::opcode::{dispatch_opcode, dispatch_qb40_special};

/// Decode one save file's bytes into a [`File`]. Never fails outright: on a
/// mid-stream decode error the partial tree built so far is returned
/// alongside the error, matching the original tool's "log and keep going"
/// behavior (§4.4 "Failure", §7). Only the header itself (bad signature or
/// unrecognized version stamp) is fatal with no output at all.
pub fn decode(data: &[u8]) -> QbResult<(File, Option<QbError>)> {
    let mut reader = ByteReader::new(data);

    let signature = reader.read_u8()?;
    if signature != 0xFC {
        return Err(QbError::InvalidSignature { found: signature });
    }
    let stamp = reader.read_u16()?;
    let dialect = Dialect::from_version_stamp(stamp).ok_or(QbError::InvalidVersion { stamp })?;

    let mut ctx = ParseContext::new();
    let mut names = NameTable::new(dialect.header_size());

    let error = decode_body(&mut reader, dialect, &mut names, &mut ctx).err();
    ctx.file.names = names.snapshot();
    Ok((ctx.file, error))
}

fn decode_body(
    reader: &mut ByteReader<'_>,
    dialect: Dialect,
    names: &mut NameTable,
    ctx: &mut ParseContext,
) -> QbResult<()> {
    let header_size = dialect.header_size();

    if dialect.is_vbdos() {
        reader.seek(0x14);
        let extra_header_len = reader.read_u16()?;
        if extra_header_len != 0 {
            ctx.file.form = forms::parse_form_layout(reader)?;
        }
    }

    reader.seek(header_size - 2);
    let procedures_offset = reader.read_u16()?;

    reader.seek(header_size + procedures_offset as u64);
    decode_opcode_stream(reader, dialect, names, ctx)?;

    while reader.remaining() >= 16 {
        decode_trailing_procedure(reader, dialect, names, ctx)?;
    }
    Ok(())
}

/// One trailing procedure record (§6): 16-byte preamble, a byte, a
/// length-prefixed name, two bytes, a flags byte (`0x80` = `STATIC`), then
/// the procedure's own length-framed opcode stream.
fn decode_trailing_procedure(
    reader: &mut ByteReader<'_>,
    dialect: Dialect,
    names: &mut NameTable,
    ctx: &mut ParseContext,
) -> QbResult<()> {
    reader.advance(16);
    reader.read_u8()?;
    let name_len = reader.read_u16()? as usize;
    let name_bytes = reader.read_bytes(name_len)?;
    reader.advance(2);
    let flags = reader.read_u8()?;
    let is_static = (flags & 0x80) != 0;

    // The record's name is embedded raw, not a name-table offset; it never
    // participates in offset-keyed de-duplication the way a referenced
    // identifier would.
    let name = Identifier::text(name_bytes, 0xFFFF);
    // The kind (SUB vs FUNCTION) is only known once the procedure's own
    // header opcode (0x0058/0x0076) runs; start with a placeholder that
    // gets overwritten by `ParseContext::set_current_proc_kind`.
    ctx.begin_procedure(Procedure::named(name, ProcKind::Sub));
    ctx.mark_current_procedure_static(is_static);
    ctx.set_pending_static(is_static);

    decode_opcode_stream(reader, dialect, names, ctx)
}

/// Decode a length-framed opcode stream: a `u16` byte count followed by
/// that many bytes of packed opcode words (§6 "code region").
fn decode_opcode_stream(
    reader: &mut ByteReader<'_>,
    dialect: Dialect,
    names: &mut NameTable,
    ctx: &mut ParseContext,
) -> QbResult<()> {
    let length = reader.read_u16()? as u64;
    let end = reader.tell() + length;

    while reader.tell() < end {
        let offset = reader.tell();
        let word = reader.read_u16()?;
        match unpack(dialect, word) {
            Some(UnpackedOpcode::Plain(decoded)) => {
                if decoded.opcode > dialect.max_opcode() {
                    return Err(QbError::InvalidOpcode { opcode: decoded.opcode, offset });
                }
                dispatch_opcode(dialect, decoded, offset, reader, names, ctx)?;
            }
            Some(UnpackedOpcode::Qb40Special(special)) => {
                dispatch_qb40_special(special, offset, ctx)?;
            }
            None => return Err(QbError::InvalidOpcode { opcode: word, offset }),
        }
    }
    reader.seek(end);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qb45_header(procedures_offset: u16) -> Vec<u8> {
        let mut header = vec![0u8; 0x1C];
        header[0] = 0xFC;
        header[1..3].copy_from_slice(&0x0100u16.to_le_bytes());
        header[0x1A..0x1C].copy_from_slice(&procedures_offset.to_le_bytes());
        header
    }

    #[test]
    fn empty_program_decodes_to_no_lines() {
        let mut data = qb45_header(0);
        data.extend_from_slice(&0u16.to_le_bytes());
        let (file, error) = decode(&data).unwrap();
        assert!(error.is_none());
        assert!(file.main.lines.is_empty());
        assert!(file.procedures.is_empty());
    }

    #[test]
    fn bad_signature_is_fatal() {
        let mut data = qb45_header(0);
        data[0] = 0x00;
        assert!(matches!(decode(&data), Err(QbError::InvalidSignature { found: 0 })));
    }

    #[test]
    fn fewer_than_sixteen_trailing_bytes_are_not_read_as_a_procedure() {
        let mut data = qb45_header(0);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&[0u8; 10]);
        let (file, error) = decode(&data).unwrap();
        assert!(error.is_none());
        assert!(file.procedures.is_empty());
    }

    #[test]
    fn trivial_print_statement_decodes_to_single_line() {
        // begin line (indent 0), push a string literal, then a print-item
        // opcode that both starts the `PRINT` statement and consumes it.
        let mut data = qb45_header(0);
        let mut code: Vec<u8> = Vec::new();
        code.extend_from_slice(&0x0000u16.to_le_bytes());
        code.extend_from_slice(&0x0170u16.to_le_bytes()); // push string literal
        code.extend_from_slice(&2u16.to_le_bytes()); // length
        code.extend_from_slice(b"HI");
        code.extend_from_slice(&0x0091u16.to_le_bytes()); // print item
        data.extend_from_slice(&(code.len() as u16).to_le_bytes());
        data.extend_from_slice(&code);
        let (file, error) = decode(&data).unwrap();
        assert!(error.is_none(), "{:?}", error);
        assert_eq!(file.main.lines.len(), 1);
        assert_eq!(qb_syntax::print_file(&file).trim_end(), "PRINT \"HI\"");
    }
}
