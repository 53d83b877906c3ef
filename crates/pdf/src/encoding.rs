//! String encodings used in the PDF body.

use std::fmt::Write as _;

/// Entries per `beginbfchar` block; the CMap format caps it at 100.
const BFCHAR_BLOCK: usize = 100;

/// Two-byte character codes as a hex string body.
pub fn hex_codes(codes: &[u16]) -> String {
    let mut out = String::with_capacity(codes.len() * 4);
    for code in codes {
        let _ = write!(out, "{:04X}", code);
    }
    out
}

/// UTF-16BE hex digits of one character.
fn utf16_hex(c: char) -> String {
    let mut buf = [0u16; 2];
    hex_codes(c.encode_utf16(&mut buf))
}

/// Bytes of a PDF literal string body, with delimiters escaped.
pub fn escape_literal(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 8);
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            _ => out.push(b),
        }
    }
    out
}

/// A PDF text string: a literal when `text` is printable ASCII, otherwise
/// UTF-16BE hex with a byte order mark.
pub fn text_string(text: &str) -> Vec<u8> {
    if text.chars().all(|c| (' '..='~').contains(&c)) {
        let mut out = vec![b'('];
        out.extend(escape_literal(text.as_bytes()));
        out.push(b')');
        return out;
    }
    let units: Vec<u16> = text.encode_utf16().collect();
    format!("<FEFF{}>", hex_codes(&units)).into_bytes()
}

/// A ToUnicode CMap mapping each code to its character.
pub fn to_unicode_cmap(mappings: &[(u16, char)]) -> String {
    let mut out = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    for block in mappings.chunks(BFCHAR_BLOCK) {
        let _ = writeln!(out, "{} beginbfchar", block.len());
        for (code, c) in block {
            let _ = writeln!(out, "<{:04X}> <{}>", code, utf16_hex(*c));
        }
        out.push_str("endbfchar\n");
    }
    out.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    out
}
