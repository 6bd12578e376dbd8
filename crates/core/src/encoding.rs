//! Minimal code page 437 decoding.
//!
//! Identifiers and VBDOS form strings are stored as raw DOS bytes (code page
//! 437). Bytes below 0x80 are plain ASCII; bytes 0x80..=0xFF map to the
//! extended Latin/box-drawing glyphs DOS used. We only need the mapping to
//! be lossless enough to round-trip identifiers and captions that happen to
//! use extended characters, not a general-purpose text transcoding layer.
#[rustfmt::skip]
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', // 0x80..0x87
    'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', // 0x88..0x8F
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', // 0x90..0x97
    'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', // 0x98..0x9F
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', // 0xA0..0xA7
    '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', // 0xA8..0xAF
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', // 0xB0..0xB7
    '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐', // 0xB8..0xBF
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', // 0xC0..0xC7
    '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧', // 0xC8..0xCF
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', // 0xD0..0xD7
    '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀', // 0xD8..0xDF
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', // 0xE0..0xE7
    'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', // 0xE8..0xEF
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', // 0xF0..0xF7
    '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}', // 0xF8..0xFF
];

/// Decode a code page 437 byte string into a Rust `String`.
pub fn decode_cp437(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                CP437_HIGH[(b - 0x80) as usize]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        assert_eq!(decode_cp437(b"PRINT"), "PRINT");
    }

    #[test]
    fn high_byte_maps_to_extended_glyph() {
        assert_eq!(decode_cp437(&[0x80]), "Ç");
        assert_eq!(decode_cp437(&[0xFF]), "\u{a0}");
    }
}
