//! In-memory byte buffer with a cursor
//!
//! Holds the full body of an open object. Reads and writes happen at the
//! cursor; writing past the end zero-fills the gap.

/// Reference point for [`ByteBuffer::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// From the start of the buffer
    Set,
    /// From the current cursor
    Current,
    /// From the end of the buffer
    End,
}

/// Growable byte buffer with an independent read/write cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    pos: u64,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing content with the cursor at the start
    pub fn from_vec(data: Vec<u8>) -> Self {
        ByteBuffer { data, pos: 0 }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Cursor position
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// True when the cursor is at or past the end
    pub fn eof(&self) -> bool {
        self.pos >= self.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Read up to `count` bytes from the cursor and advance it
    pub fn read(&mut self, count: usize) -> Vec<u8> {
        let n = count.min(self.remaining());
        let mut out = vec![0u8; n];
        self.read_into(&mut out);
        out
    }

    fn remaining(&self) -> usize {
        self.len().saturating_sub(self.pos) as usize
    }

    /// Read into `buf`, returning the number of bytes copied
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        if self.eof() {
            return 0;
        }
        let start = self.pos as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        n
    }

    /// Write at the cursor, overwriting and extending as needed
    ///
    /// Returns 0 without changing anything if the buffer cannot grow to
    /// cover the write.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        if bytes.is_empty() {
            return 0;
        }
        let start = self.pos as usize;
        let Some(end) = start.checked_add(bytes.len()) else {
            return 0;
        };
        if !self.grow_to(end) {
            return 0;
        }
        self.data[start..end].copy_from_slice(bytes);
        self.pos = end as u64;
        bytes.len()
    }

    /// Zero-extend to at least `size` bytes; false if the allocation fails
    fn grow_to(&mut self, size: usize) -> bool {
        let len = self.data.len();
        if size <= len {
            return true;
        }
        if self.data.try_reserve_exact(size - len).is_err() {
            return false;
        }
        self.data.resize(size, 0);
        true
    }

    /// Move the cursor
    ///
    /// Returns false, leaving the cursor untouched, if the target would be
    /// negative or overflow. Seeking past the end is allowed.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> bool {
        let base = match whence {
            Whence::Set => 0,
            Whence::Current => self.pos,
            Whence::End => self.len(),
        };

        let target = if offset >= 0 {
            base.checked_add(offset as u64)
        } else {
            base.checked_sub(offset.unsigned_abs())
        };

        match target {
            Some(pos) if usize::try_from(pos).is_ok() => {
                self.pos = pos;
                true
            }
            _ => false,
        }
    }

    /// Resize to `size` bytes, zero-filling growth. The cursor is unchanged.
    ///
    /// Returns false, leaving the content untouched, if the buffer cannot
    /// grow that far.
    pub fn truncate(&mut self, size: u64) -> bool {
        let Ok(size) = usize::try_from(size) else {
            return false;
        };
        if size <= self.data.len() {
            self.data.truncate(size);
            return true;
        }
        self.grow_to(size)
    }
}
