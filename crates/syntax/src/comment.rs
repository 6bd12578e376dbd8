use serde::{Deserialize, Serialize};

use qb_core::Identifier;

/// A `'$...'` metacommand riding inside a comment, or a standalone `REM`
/// (§3 "Comment", §4.4 metacommand opcodes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Metacommand {
    Include(Vec<u8>),
    Static,
    Dynamic,
    Form(Identifier),
}

/// A trailing `'` comment attached to a [`crate::line::Line`]. Its text has
/// already been through run-length expansion (§4.4 "`0x0D N X`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub text: Vec<u8>,
    /// Target print column so comments on consecutive lines line up
    /// (§4.5).
    pub column: Option<usize>,
    pub metacommand: Option<Metacommand>,
}

/// Expand a run-length compressed comment body: `0x0D N X` means "repeat
/// byte `X`, `N` times". This is a left inverse only — there is no
/// corresponding compressor, since the encoder never has to run in this
/// tool.
pub fn expand_comment_runs(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == 0x0D && i + 2 < raw.len() {
            let count = raw[i + 1];
            let byte = raw[i + 2];
            out.extend(std::iter::repeat(byte).take(count as usize));
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_expanded_to_repeated_byte() {
        let raw = [b'-', 0x0D, 5, b'=', b'!'];
        assert_eq!(expand_comment_runs(&raw), b"-=====!");
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        let raw = b"hello world";
        assert_eq!(expand_comment_runs(raw), raw);
    }

    #[test]
    fn trailing_marker_byte_without_a_full_run_is_left_untouched() {
        let raw = [b'x', 0x0D, 3];
        assert_eq!(expand_comment_runs(&raw), raw);
    }
}
