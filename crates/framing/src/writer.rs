use bytes::BufMut;
use log::{error, warn};

use crate::delivery::Delivery;
use crate::varint;

/// Size of a frame header: the u16 length prefix plus the tag byte.
pub(crate) const FRAME_HEADER_SIZE: usize = 3;

/// Capacity pooled buffers are trimmed back to between uses.
const POOL_BUFFER_CAP: usize = 1024;

/// Maximum number of idle buffers the pool holds onto.
const POOL_MAX_IDLE: usize = 32;

lazy_static::lazy_static! {
    static ref BUFFER_POOL: std::sync::Mutex<Vec<Vec<u8>>> = std::sync::Mutex::new(Vec::new());
}

fn pool_acquire() -> Vec<u8> {
    let mut pool = BUFFER_POOL.lock().unwrap_or_else(|p| p.into_inner());
    pool.pop()
        .unwrap_or_else(|| Vec::with_capacity(POOL_BUFFER_CAP))
}

fn pool_release(mut buffer: Vec<u8>) {
    buffer.clear();
    buffer.shrink_to(POOL_BUFFER_CAP);
    let mut pool = BUFFER_POOL.lock().unwrap_or_else(|p| p.into_inner());
    if pool.len() < POOL_MAX_IDLE {
        pool.push(buffer);
    }
}

/// A writer builds nested length-framed messages in an owned buffer.
///
/// Acquire one with [MessageWriter::get], open frames with [MessageWriter::start_message], write
/// scalars, close frames with [MessageWriter::end_message], then hand [MessageWriter::as_bytes]
/// to a transport and call [MessageWriter::recycle].  Starts and ends must balance; the nesting
/// order defines the on-wire structure.
///
/// A writer is exclusively owned: nothing else may write to its buffer while it lives, and it may
/// not be reused after recycling.
pub struct MessageWriter {
    delivery: Delivery,
    buffer: Vec<u8>,

    /// Offsets of the length prefixes of currently open frames, innermost last.
    open_frames: Vec<usize>,

    recycled: bool,
}

impl MessageWriter {
    /// Acquire a writer for the given delivery mode, reusing a pooled buffer when one is idle.
    pub fn get(delivery: Delivery) -> MessageWriter {
        MessageWriter {
            delivery,
            buffer: pool_acquire(),
            open_frames: Vec::new(),
            recycled: false,
        }
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    /// Bytes written so far, including the headers of any still-open frames.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of frames opened but not yet closed.
    pub fn open_frames(&self) -> usize {
        self.open_frames.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..]
    }

    /// Open a frame: a zeroed length placeholder and the tag.  The real length lands at the
    /// matching [MessageWriter::end_message].
    pub fn start_message(&mut self, tag: u8) {
        self.open_frames.push(self.buffer.len());
        self.buffer.put_u16_le(0);
        self.buffer.put_u8(tag);
    }

    /// Close the innermost open frame, backfilling its length prefix with the number of content
    /// bytes written since the matching start.
    ///
    /// An unbalanced call is logged and ignored; already-written bytes are never disturbed.
    pub fn end_message(&mut self) {
        let start = match self.open_frames.pop() {
            Some(start) => start,
            None => {
                error!("end_message called with no open frame; ignoring");
                return;
            }
        };

        let content_len = self.buffer.len() - start - FRAME_HEADER_SIZE;
        let prefix = u16::try_from(content_len).unwrap_or_else(|_| {
            error!(
                "frame content length {} exceeds the u16 prefix; clamping",
                content_len
            );
            u16::MAX
        });
        self.buffer[start..start + 2].copy_from_slice(&prefix.to_le_bytes());
    }

    pub fn write_u8(&mut self, val: u8) {
        self.buffer.put_u8(val);
    }

    pub fn write_i8(&mut self, val: i8) {
        self.buffer.put_i8(val);
    }

    pub fn write_u16(&mut self, val: u16) {
        self.buffer.put_u16_le(val);
    }

    pub fn write_i16(&mut self, val: i16) {
        self.buffer.put_i16_le(val);
    }

    pub fn write_u32(&mut self, val: u32) {
        self.buffer.put_u32_le(val);
    }

    pub fn write_i32(&mut self, val: i32) {
        self.buffer.put_i32_le(val);
    }

    pub fn write_u64(&mut self, val: u64) {
        self.buffer.put_u64_le(val);
    }

    pub fn write_i64(&mut self, val: i64) {
        self.buffer.put_i64_le(val);
    }

    pub fn write_f32(&mut self, val: f32) {
        self.buffer.put_f32_le(val);
    }

    pub fn write_bool(&mut self, val: bool) {
        self.buffer.put_u8(val as u8);
    }

    /// Packed length, then the UTF-8 bytes.
    pub fn write_str(&mut self, val: &str) {
        varint::encode_packed_u32(val.len() as u32, &mut self.buffer);
        self.buffer.put_slice(val.as_bytes());
    }

    /// Raw bytes, no length.  The enclosing frame's prefix is the only record of how long this is.
    pub fn write_bytes(&mut self, val: &[u8]) {
        self.buffer.put_slice(val);
    }

    /// Packed length, then the bytes.
    pub fn write_bytes_and_size(&mut self, val: &[u8]) {
        varint::encode_packed_u32(val.len() as u32, &mut self.buffer);
        self.buffer.put_slice(val);
    }

    pub fn write_packed_u32(&mut self, val: u32) {
        varint::encode_packed_u32(val, &mut self.buffer);
    }

    /// Packed write of an i32, reinterpreted as its u32 bit pattern.  Negative values always take
    /// the maximum width.
    pub fn write_packed_i32(&mut self, val: i32) {
        self.write_packed_u32(val as u32);
    }

    /// Embed another writer's bytes into this one.
    ///
    /// With `include_header` false, the other writer's first frame header is stripped so only its
    /// contents land here; the other writer must then start with a frame.
    pub fn write_message(&mut self, other: &MessageWriter, include_header: bool) {
        let bytes = other.as_bytes();
        if include_header {
            self.buffer.put_slice(bytes);
        } else if bytes.len() >= FRAME_HEADER_SIZE {
            self.buffer.put_slice(&bytes[FRAME_HEADER_SIZE..]);
        } else {
            error!("embedded message too short to strip a frame header; ignoring");
        }
    }

    /// Return the buffer to the shared pool.  The writer is gone after this.
    pub fn recycle(mut self) {
        self.recycled = true;
        pool_release(std::mem::take(&mut self.buffer));
    }
}

impl Drop for MessageWriter {
    fn drop(&mut self) {
        if !self.recycled {
            warn!("MessageWriter dropped without recycle; its buffer goes back to the allocator instead of the pool");
        }
    }
}
