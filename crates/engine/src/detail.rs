use std::borrow::Cow;

/// Caller-owned memory the engine writes the detailed report into.
///
/// Allocated zeroed before the call, so bytes past the engine's write cursor
/// read as NUL instead of garbage. Handed to the engine as a plain slice for
/// the duration of one call only.
#[derive(Debug)]
pub(crate) struct DetailBuffer {
    bytes: Vec<u8>,
}

impl DetailBuffer {
    pub(crate) fn new(capacity: u32) -> Self {
        Self {
            bytes: vec![0; capacity as usize],
        }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Keeps the `[0, min(needed, capacity))` prefix.
    pub(crate) fn into_detail(mut self, needed: u32) -> Detail {
        let capacity = self.bytes.len() as u32;
        self.bytes.truncate(needed.min(capacity) as usize);
        Detail {
            bytes: self.bytes,
            needed,
            capacity,
        }
    }
}

/// Whether the detail buffer held the whole report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    /// Only a `capacity`-byte prefix was kept. Retry with at least `needed`
    /// bytes to get the rest.
    Truncated { needed: u32, capacity: u32 },
}

/// Detailed report text of an extended scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    bytes: Vec<u8>,
    needed: u32,
    capacity: u32,
}

impl Detail {
    /// Size the engine needed for the full report.
    pub fn needed_size(&self) -> u32 {
        self.needed
    }

    /// Size of the buffer that was offered.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn completeness(&self) -> Completeness {
        if self.needed <= self.capacity {
            Completeness::Complete
        } else {
            Completeness::Truncated {
                needed: self.needed,
                capacity: self.capacity,
            }
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.completeness() != Completeness::Complete
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The kept bytes as text. A truncated prefix may end inside a UTF-8
    /// sequence, which shows up as U+FFFD.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: u32, written: &[u8], needed: u32) -> Detail {
        let mut buffer = DetailBuffer::new(capacity);
        let slice = buffer.as_mut_slice();
        let n = written.len().min(slice.len());
        slice[..n].copy_from_slice(&written[..n]);
        buffer.into_detail(needed)
    }

    #[test]
    fn fitting_report_is_complete() {
        let detail = filled(64, br#"{"pid":4}"#, 9);
        assert_eq!(detail.completeness(), Completeness::Complete);
        assert_eq!(detail.len(), 9);
        assert_eq!(detail.text(), r#"{"pid":4}"#);
    }

    #[test]
    fn decoding_is_by_length_not_terminator() {
        // embedded NUL is kept, trailing buffer space is not
        let detail = filled(16, b"ab\0cd", 5);
        assert_eq!(detail.as_bytes(), b"ab\0cd");
        assert!(!detail.is_truncated());
    }

    #[test]
    fn oversized_report_is_truncated_to_capacity() {
        let detail = filled(4, b"0123456789", 10);
        assert_eq!(
            detail.completeness(),
            Completeness::Truncated {
                needed: 10,
                capacity: 4
            }
        );
        assert_eq!(detail.as_bytes(), b"0123");
        assert_eq!(detail.needed_size(), 10);
    }

    #[test]
    fn unwritten_tail_reads_as_nul() {
        let detail = filled(6, b"abc", 8);
        assert_eq!(detail.as_bytes(), b"abc\0\0\0");
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let detail = filled(0, b"", 120);
        assert!(detail.is_empty());
        assert!(detail.is_truncated());
        assert_eq!(detail.capacity(), 0);
    }

    #[test]
    fn cut_utf8_is_replaced() {
        let detail = filled(2, "é!".as_bytes(), 3);
        assert_eq!(detail.text(), "é");
        let detail = filled(1, "é".as_bytes(), 2);
        assert_eq!(detail.text(), "\u{fffd}");
    }
}
