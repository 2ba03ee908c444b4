//! Bounded hex rendering of chain contents for diagnostics.

use std::fmt;

use super::BufferChain;

const BYTES_PER_ROW: usize = 16;

/// Display adapter rendering the leading bytes of a chain as a hex dump.
///
/// Rows follow the classic `offset | hex | ascii` shape; output is bounded by
/// the construction-time limit so a corrupt multi-megabyte event cannot flood
/// a log sink.
///
/// # Examples
///
/// ```
/// use putframe::chain::BufferChain;
///
/// let chain = BufferChain::from_slice(b"hello");
/// let dump = format!("{}", chain.hex_dump(16));
/// assert!(dump.contains("68 65 6c 6c 6f"));
/// assert!(dump.contains("|hello"));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct HexDump<'a> {
    chain: Option<&'a BufferChain>,
    limit: usize,
}

impl<'a> HexDump<'a> {
    pub(crate) const fn new(chain: Option<&'a BufferChain>, limit: usize) -> Self {
        Self { chain, limit }
    }
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(chain) = self.chain else {
            return writeln!(f, "(no event bound)");
        };
        if chain.is_empty() {
            return writeln!(f, "(empty)");
        }
        let shown = self.limit.min(chain.len());
        let mut bytes = vec![0_u8; shown];
        // The range is clamped to the chain length, so the copy cannot fail.
        if chain.read_at(chain.start(), &mut bytes).is_err() {
            return writeln!(f, "(unreadable)");
        }
        for (row, chunk) in bytes.chunks(BYTES_PER_ROW).enumerate() {
            write!(f, "{:08x}  ", row * BYTES_PER_ROW)?;
            for index in 0..BYTES_PER_ROW {
                match chunk.get(index) {
                    Some(byte) => write!(f, "{byte:02x} ")?,
                    None => write!(f, "   ")?,
                }
            }
            write!(f, " |")?;
            for byte in chunk {
                let glyph = if byte.is_ascii_graphic() || *byte == b' ' {
                    *byte as char
                } else {
                    '.'
                };
                write!(f, "{glyph}")?;
            }
            writeln!(f, "|")?;
        }
        if chain.len() > shown {
            writeln!(f, "… ({} more bytes)", chain.len() - shown)?;
        }
        Ok(())
    }
}
