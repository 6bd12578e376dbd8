use thiserror::Error;

/// Everything that can go wrong while detokenizing a QB/VBDOS save file.
///
/// Decode-time variants carry the byte offset of the opcode that failed, so
/// the CLI can report a precise location in place of the original tool's
/// traceback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QbError {
    #[error("invalid signature byte 0x{found:02X}, expected 0xFC")]
    InvalidSignature { found: u8 },

    #[error("unrecognized version stamp 0x{stamp:04X}")]
    InvalidVersion { stamp: u16 },

    #[error("unexpected end of file at offset 0x{offset:X}")]
    UnexpectedEof { offset: u64 },

    #[error("opcode 0x{opcode:04X} at offset 0x{offset:X} exceeds the dialect's maximum")]
    InvalidOpcode { opcode: u16, offset: u64 },

    #[error("operand stack underflow at offset 0x{offset:X}: needed {needed}, had {available}")]
    StackUnderflow {
        offset: u64,
        needed: usize,
        available: usize,
    },

    #[error("positional argument {position} set twice at offset 0x{offset:X}")]
    DuplicateArgument { position: &'static str, offset: u64 },

    #[error("no identifier cached or resolvable for name offset 0x{offset:04X}")]
    UnknownNameOffset { offset: u16 },

    #[error("structural inconsistency at offset 0x{offset:X}: {message}")]
    Structural { offset: u64, message: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for QbError {
    fn from(e: std::io::Error) -> Self {
        QbError::Io(e.to_string())
    }
}

impl QbError {
    pub fn structural(offset: u64, message: impl Into<String>) -> Self {
        QbError::Structural {
            offset,
            message: message.into(),
        }
    }
}

pub type QbResult<T> = Result<T, QbError>;
