use bytes::Buf;

use crate::varint::{self, PackedError};
use crate::writer::FRAME_HEADER_SIZE;

#[derive(Debug, derive_more::Display, thiserror::Error)]
pub enum ReadError {
    /// The buffer ended before the requested value.
    NotEnoughData,

    /// A string's bytes were not valid UTF-8.
    BadUtf8,

    Packed(#[from] PackedError),
}

/// A reference reader over one captured buffer.
///
/// Mirrors [crate::MessageWriter]: [MessageReader::read_message] yields a frame's tag and a
/// sub-reader scoped to exactly that frame's contents, advancing this reader past the whole
/// frame.  Unlike a streaming parser there is no feeding; a captured buffer is complete by
/// construction, so reads either succeed or fail permanently.
///
/// After an error the read position is unspecified.
pub struct MessageReader<'a> {
    data: &'a [u8],
}

impl<'a> MessageReader<'a> {
    pub fn new(data: &'a [u8]) -> MessageReader<'a> {
        MessageReader { data }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], ReadError> {
        if self.data.len() < count {
            return Err(ReadError::NotEnoughData);
        }
        let (head, tail) = self.data.split_at(count);
        self.data = tail;
        Ok(head)
    }

    /// Read the next frame, returning its tag and a reader scoped to its contents.
    pub fn read_message(&mut self) -> Result<(u8, MessageReader<'a>), ReadError> {
        let mut header = self.take(FRAME_HEADER_SIZE)?;
        let length = header.get_u16_le() as usize;
        let tag = header.get_u8();
        let contents = self.take(length)?;
        Ok((tag, MessageReader::new(contents)))
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, ReadError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        Ok(self.take(2)?.get_u16_le())
    }

    pub fn read_i16(&mut self) -> Result<i16, ReadError> {
        Ok(self.take(2)?.get_i16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        Ok(self.take(4)?.get_u32_le())
    }

    pub fn read_i32(&mut self) -> Result<i32, ReadError> {
        Ok(self.take(4)?.get_i32_le())
    }

    pub fn read_u64(&mut self) -> Result<u64, ReadError> {
        Ok(self.take(8)?.get_u64_le())
    }

    pub fn read_i64(&mut self) -> Result<i64, ReadError> {
        Ok(self.take(8)?.get_i64_le())
    }

    pub fn read_f32(&mut self) -> Result<f32, ReadError> {
        Ok(self.take(4)?.get_f32_le())
    }

    pub fn read_bool(&mut self) -> Result<bool, ReadError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_packed_u32(&mut self) -> Result<u32, ReadError> {
        let mut buf = self.data;
        let val = varint::decode_packed_u32(&mut buf)?;
        self.data = buf;
        Ok(val)
    }

    pub fn read_packed_i32(&mut self) -> Result<i32, ReadError> {
        Ok(self.read_packed_u32()? as i32)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], ReadError> {
        self.take(count)
    }

    pub fn read_bytes_and_size(&mut self) -> Result<&'a [u8], ReadError> {
        let length = self.read_packed_u32()? as usize;
        self.take(length)
    }

    pub fn read_str(&mut self) -> Result<&'a str, ReadError> {
        let bytes = self.read_bytes_and_size()?;
        std::str::from_utf8(bytes).map_err(|_| ReadError::BadUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_frame_is_an_error() {
        // Claims 4 content bytes, supplies 2.
        let data = [4u8, 0, 1, 0xaa, 0xbb];
        let mut reader = MessageReader::new(&data);
        assert!(matches!(
            reader.read_message(),
            Err(ReadError::NotEnoughData)
        ));
    }

    #[test]
    fn test_sub_reader_is_scoped() {
        // One frame with a single byte, then a trailing byte outside it.
        let data = [1u8, 0, 7, 42, 99];
        let mut reader = MessageReader::new(&data);
        let (tag, mut frame) = reader.read_message().expect("Should read");
        assert_eq!(tag, 7);
        assert_eq!(frame.read_u8().expect("Should read"), 42);
        assert!(matches!(frame.read_u8(), Err(ReadError::NotEnoughData)));
        assert_eq!(reader.remaining(), 1);
    }
}
