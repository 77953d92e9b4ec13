use std::fmt::Write;

const BYTES_PER_LINE: usize = 16;

/// Formats `bytes` as a classic hex dump, labelling lines from `base`.
///
/// ```text
/// 00000200  60 0a 61 05 80 14 00 00  00 00 00 00 00 00 00 00  |`.a.............|
/// ```
pub fn hex_dump(bytes: &[u8], base: usize) -> String {
    let mut out = String::new();
    for (line, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        // Writing to a String cannot fail
        let _ = write!(out, "{:08x} ", base + line * BYTES_PER_LINE);
        for column in 0..BYTES_PER_LINE {
            if column == BYTES_PER_LINE / 2 {
                out.push(' ');
            }
            match chunk.get(column) {
                Some(byte) => {
                    let _ = write!(out, " {:02x}", byte);
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("  |");
        out.extend(chunk.iter().map(|&byte| printable(byte)));
        out.push_str("|\n");
    }
    out
}

fn printable(byte: u8) -> char {
    if byte.is_ascii_graphic() || byte == b' ' {
        byte as char
    } else {
        '.'
    }
}
