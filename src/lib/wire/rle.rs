//! Run-length decode for legacy (BR24) spokes (§4.A, §9).
//!
//! The escape byte `0x5C` introduces a `(count, code)` pair; anything else is
//! a literal byte expanded into two nibble-padded output bytes. When the
//! `data_len`-bounded pass underproduces, a tail fixup continues reading raw
//! bytes (bounded by `length - 8`) without the low-nibble padding until the
//! output reaches 512 bytes.

use super::RETURNS_PER_LINE;

const ESCAPE: u8 = 0x5C;

fn expand_padded(b: u8, out: &mut Vec<u8>) {
    out.push((((b & 0x0F) << 4) | 0x0F) as u8);
    if out.len() < RETURNS_PER_LINE {
        out.push(((b & 0xF0) | 0x0F) as u8);
    }
}

fn expand_unpadded(b: u8, out: &mut Vec<u8>) {
    out.push((b & 0x0F) << 4);
    if out.len() < RETURNS_PER_LINE {
        out.push(b & 0xF0);
    }
}

/// Decode one spoke's RLE payload. `src` is the record's data bytes (starting
/// right after the 12-byte `type`/`length`/`data_len` header); `data_len` and
/// `length` are that header's fields. Always returns exactly
/// `RETURNS_PER_LINE` bytes.
pub fn decode(src: &[u8], data_len: u32, length: u32) -> [u8; RETURNS_PER_LINE] {
    let mut out = Vec::with_capacity(RETURNS_PER_LINE);
    let data_len = data_len as usize;
    let mut consumed = 0usize;
    let mut i = 0usize;

    while consumed < data_len && out.len() < RETURNS_PER_LINE {
        let Some(&b) = src.get(i) else { break };
        if b != ESCAPE {
            expand_padded(b, &mut out);
            i += 1;
            consumed += 1;
        } else {
            let (Some(&n), Some(&c)) = (src.get(i + 1), src.get(i + 2)) else {
                break;
            };
            for _ in 0..n {
                if out.len() >= RETURNS_PER_LINE {
                    break;
                }
                expand_padded(c, &mut out);
            }
            i += 3;
            consumed += 3;
        }
    }

    let tail_bound = (length as usize).saturating_sub(8);
    while out.len() < RETURNS_PER_LINE && consumed < tail_bound {
        let Some(&b) = src.get(i) else { break };
        expand_unpadded(b, &mut out);
        i += 1;
        consumed += 1;
    }

    out.resize(RETURNS_PER_LINE, 0);
    out.truncate(RETURNS_PER_LINE);
    out.try_into().expect("resized to RETURNS_PER_LINE")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_worked_example() {
        let src = [0x12u8, 0x5C, 0x03, 0xAB, 0x34];
        let out = decode(&src, 5, 13);
        assert_eq!(
            &out[0..10],
            &[0x2F, 0x1F, 0xBF, 0xAF, 0xBF, 0xAF, 0xBF, 0xAF, 0x4F, 0x3F]
        );
        assert_eq!(out.len(), RETURNS_PER_LINE);
    }

    #[test]
    fn always_produces_512_bytes() {
        let out = decode(&[], 0, 8);
        assert_eq!(out.len(), RETURNS_PER_LINE);
    }

    #[test]
    fn oversupply_is_truncated() {
        // A single escape run that would overproduce far past 512 bytes.
        let src = [ESCAPE, 0xFF, 0xAA];
        let out = decode(&src, 3, 11);
        assert_eq!(out.len(), RETURNS_PER_LINE);
    }
}
