//! Byte regions with a read/write cursor.
//!
//! A `BufferRegion` owns a fixed block of bytes and exposes the classic
//! `position <= limit <= capacity` cursor model. Codecs only ever touch
//! `[position, limit)` and move `position` forward as they consume or produce.
//!
//! The `direct` flag marks memory that a native backend can address without an
//! intermediate copy (allocated through `NativeBackend::allocate_direct`).

use std::fmt;

use crate::error::{Error, Result};

pub struct BufferRegion {
    data: Box<[u8]>,
    position: usize,
    limit: usize,
    direct: bool,
}

impl BufferRegion {
    /// Managed (heap) region of `capacity` zeroed bytes, ready for writing.
    pub fn allocate(capacity: usize) -> Self {
        Self::zeroed(capacity, false)
    }

    /// Native-addressable region of `capacity` zeroed bytes, ready for writing.
    pub fn allocate_direct(capacity: usize) -> Self {
        Self::zeroed(capacity, true)
    }

    fn zeroed(capacity: usize, direct: bool) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            position: 0,
            limit: capacity,
            direct,
        }
    }

    /// Wrap existing bytes as a managed region ready for reading
    /// (`position = 0`, `limit = capacity = bytes.len()`).
    pub fn wrap(bytes: Vec<u8>) -> Self {
        let limit = bytes.len();
        Self {
            data: bytes.into_boxed_slice(),
            position: 0,
            limit,
            direct: false,
        }
    }

    /// Same as [`BufferRegion::wrap`] but flagged native-addressable.
    pub fn wrap_direct(bytes: Vec<u8>) -> Self {
        let mut region = Self::wrap(bytes);
        region.direct = true;
        region
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.limit {
            return Err(Error::Region(format!(
                "position {position} exceeds limit {}",
                self.limit
            )));
        }
        self.position = position;
        Ok(())
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Move the limit. The position is clamped down if it now lies past the limit.
    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        if limit > self.capacity() {
            return Err(Error::Region(format!(
                "limit {limit} exceeds capacity {}",
                self.capacity()
            )));
        }
        self.limit = limit;
        if self.position > limit {
            self.position = limit;
        }
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    pub fn is_direct(&self) -> bool {
        self.direct
    }

    /// Advance `position` by `n` bytes, never beyond `limit`.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::Region(format!(
                "cannot advance {n} bytes with only {} remaining",
                self.remaining()
            )));
        }
        self.position += n;
        Ok(())
    }

    /// Switch from writing to reading: `limit = position`, `position = 0`.
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Reset for writing: `position = 0`, `limit = capacity`. Contents are kept.
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.capacity();
    }

    /// Bytes in `[position, limit)`.
    pub fn remaining_slice(&self) -> &[u8] {
        &self.data[self.position..self.limit]
    }

    /// Writable bytes in `[position, limit)`.
    pub fn remaining_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.position..self.limit]
    }

    /// Bytes produced so far, `[0, position)`.
    pub fn written(&self) -> &[u8] {
        &self.data[..self.position]
    }

    /// Bytes visible to a reader, `[0, limit)`.
    pub fn readable(&self) -> &[u8] {
        &self.data[..self.limit]
    }

    /// Copy `src` at the cursor and advance past it.
    pub fn put_slice(&mut self, src: &[u8]) -> Result<()> {
        if src.len() > self.remaining() {
            return Err(Error::Region(format!(
                "cannot put {} bytes with only {} remaining",
                src.len(),
                self.remaining()
            )));
        }
        let start = self.position;
        self.data[start..start + src.len()].copy_from_slice(src);
        self.position += src.len();
        Ok(())
    }
}

impl fmt::Debug for BufferRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferRegion")
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("capacity", &self.capacity())
            .field("direct", &self.direct)
            .finish()
    }
}
