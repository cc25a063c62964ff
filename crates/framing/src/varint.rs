use bytes::{Buf, BufMut};

/// Number of bytes to completely encode a u32.
pub(crate) const MAX_PACKED_BYTES: u32 = 5;

#[derive(Debug, Eq, PartialEq, thiserror::Error, derive_more::Display)]
pub enum PackedError {
    /// The input buffer was empty.
    NoData,

    /// The encoding ran past the widest legal u32 form.
    TooLong,

    /// The buffer ended mid-value.  Contains the partial value.
    Incomplete(u32),
}

/// A packed-integer encoder.
///
/// Writes 7-bit groups in little endian order, continuation bit set on every byte but the last.
pub fn encode_packed_u32(mut input: u32, dest: &mut impl BufMut) {
    loop {
        let group = input & 0x7f;
        input >>= 7;
        if input == 0 {
            dest.put_u8(group as u8);
            break;
        }
        dest.put_u8((group | 0x80) as u8);
    }
}

/// A packed-integer decoder.
///
/// Returns `Incomplete` with the partial value so far if the buffer ends mid-value.
pub fn decode_packed_u32(input: &mut impl Buf) -> Result<u32, PackedError> {
    let mut res: u32 = 0;

    for i in 0..MAX_PACKED_BYTES {
        if !input.has_remaining() {
            if i == 0 {
                return Err(PackedError::NoData);
            }
            return Err(PackedError::Incomplete(res));
        }

        let byte = input.get_u8();
        let done = (byte & 0x80) == 0;
        res |= ((byte & 0x7f) as u32) << (7 * i);

        if done {
            return Ok(res);
        }
    }

    // Five continuation bytes can't happen in a u32 encoding.
    Err(PackedError::TooLong)
}
