use crate::{error::WireError, traits::{Decode, Encode}, wire::WireKind};

/// A polyglot byte buffer meant for reading.
///
/// Example usage:
///
/// ```
/// let mut bb = polyglot_schema::ByteBuffer::new(&[4, 240, 159, 141, 149, 0x42, 0xF6, 0xE9, 0x79]);
/// assert_eq!(bb.read_string(), Ok("🍕".to_owned()));
/// assert_eq!(bb.read_float(), Ok(123.456));
/// ```
///
pub struct ByteBuffer<'a> {
    data:  &'a [u8],
    index: usize,
    /// Messages this buffer is nested inside.
    depth: usize,
}

/// Deepest message nesting a reader accepts before giving up with
/// [`WireError::RecursionLimit`].
pub const RECURSION_LIMIT: usize = 100;

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice. The lifetime
    /// of the returned ByteBuffer must not outlive the lifetime of the byte
    /// slice.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0, depth: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as `self.data().len()` when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of message frames entered to reach this buffer.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn eof(&self, needed: usize) -> WireError {
        WireError::UnexpectedEof {
            offset: self.index,
            needed: needed - self.remaining(),
        }
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, WireError> {
        match self.data.get(self.index) {
            Some(&value) => {
                self.index += 1;
                Ok(value)
            }
            None => Err(self.eof(1)),
        }
    }

    /// Try to read a boolean. Only `0` and `1` are accepted.
    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        let offset = self.index;
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(WireError::InvalidBool { offset, value }),
        }
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if len > self.remaining() {
            return Err(self.eof(len));
        }
        let value = &self.data[self.index..self.index + len];
        self.index += len;
        Ok(value)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Try to read a variable-length unsigned 32-bit integer (at most five
    /// bytes) starting at the current index.
    pub fn read_var_uint(&mut self) -> Result<u32, WireError> {
        let offset = self.index;
        let mut result: u32 = 0;

        for shift in (0..35).step_by(7) {
            let byte = self.read_byte()?;
            if shift == 28 && byte > 0x0F {
                break;
            }
            result |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }

        Err(WireError::VarintOverflow { offset, bits: 32 })
    }

    /// Try to read a zigzag-encoded signed 32-bit integer.
    pub fn read_var_int(&mut self) -> Result<i32, WireError> {
        let value = self.read_var_uint()?;
        Ok(((value >> 1) as i32) ^ -((value & 1) as i32))
    }

    /// Try to read a variable-length unsigned 64-bit integer (at most ten
    /// bytes) starting at the current index.
    pub fn read_var_uint64(&mut self) -> Result<u64, WireError> {
        let offset = self.index;
        let mut result: u64 = 0;

        for shift in (0..70).step_by(7) {
            let byte = self.read_byte()?;
            if shift == 63 && byte > 0x01 {
                break;
            }
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }

        Err(WireError::VarintOverflow { offset, bits: 64 })
    }

    /// Try to read a zigzag-encoded signed 64-bit integer.
    pub fn read_var_int64(&mut self) -> Result<i64, WireError> {
        let value = self.read_var_uint64()?;
        Ok(((value >> 1) as i64) ^ -((value & 1) as i64))
    }

    /// Fixed-width values are big-endian.
    pub fn read_fixed32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_sfixed32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_fixed64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_sfixed64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_float(&mut self) -> Result<f32, WireError> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    pub fn read_double(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Reads a varint length or element count and checks it against the bytes
    /// left in the buffer. Every encoded element takes at least one byte, so a
    /// count larger than the remainder can never be satisfied.
    pub fn read_len(&mut self) -> Result<usize, WireError> {
        let offset = self.index;
        let len = self.read_var_uint64()?;
        let remaining = self.remaining();
        if len > remaining as u64 {
            return Err(WireError::LengthOutOfBounds { offset, len, remaining });
        }
        Ok(len as usize)
    }

    /// Try to read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, WireError> {
        let offset = self.index;
        let len = self.read_len()?;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| WireError::InvalidUtf8 { offset })
    }

    /// Try to read a length-prefixed byte array.
    pub fn read_byte_array(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.read_len()?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Reads a length-delimited payload and returns a buffer over just that
    /// payload. The outer buffer is advanced past it whether or not the
    /// returned buffer is consumed.
    pub fn read_frame(&mut self) -> Result<ByteBuffer<'a>, WireError> {
        let len = self.read_len()?;
        let data = self.read_bytes(len)?;
        Ok(ByteBuffer { data, index: 0, depth: self.depth })
    }

    /// Reads the frame of a nested message, one level deeper than this
    /// buffer. Fails once nesting passes [`RECURSION_LIMIT`].
    pub fn read_message_frame(&mut self) -> Result<ByteBuffer<'a>, WireError> {
        if self.depth >= RECURSION_LIMIT {
            return Err(WireError::RecursionLimit { offset: self.index, limit: RECURSION_LIMIT });
        }
        let mut frame = self.read_frame()?;
        frame.depth = self.depth + 1;
        Ok(frame)
    }

    /// Reads a nested message frame. Bytes left in the frame after the
    /// message's known fields are skipped.
    pub fn read_message<T: Decode>(&mut self) -> Result<T, WireError> {
        let mut frame = self.read_message_frame()?;
        T::decode_bb(&mut frame)
    }

    /// Skips one value of the given kind without materializing it.
    pub fn skip(&mut self, kind: WireKind) -> Result<(), WireError> {
        match kind {
            WireKind::SignedVarint | WireKind::UnsignedVarint => {
                self.read_var_uint64()?;
            }
            WireKind::Fixed32 | WireKind::Fixed64 => {
                let width = kind.fixed_width().unwrap_or_default();
                self.read_bytes(width)?;
            }
            WireKind::LengthDelimitedBytes | WireKind::LengthDelimitedNested => {
                let len = self.read_len()?;
                self.read_bytes(len)?;
            }
        }
        Ok(())
    }
}

#[test]
fn read_bool() {
    let read = |bytes| ByteBuffer::new(bytes).read_bool();
    assert_eq!(read(&[]), Err(WireError::UnexpectedEof { offset: 0, needed: 1 }));
    assert_eq!(read(&[0]), Ok(false));
    assert_eq!(read(&[1]), Ok(true));
    assert_eq!(read(&[2]), Err(WireError::InvalidBool { offset: 0, value: 2 }));
}

#[test]
fn read_bytes() {
    let mut bb = ByteBuffer::new(&[1, 2, 3, 4, 5]);
    assert_eq!(bb.read_bytes(3), Ok([1, 2, 3].as_slice()));
    assert_eq!(bb.read_bytes(2), Ok([4, 5].as_slice()));
    assert_eq!(bb.read_bytes(1), Err(WireError::UnexpectedEof { offset: 5, needed: 1 }));
    assert!(bb.is_empty());
}

#[test]
fn read_var_uint() {
    let read = |bytes| ByteBuffer::new(bytes).read_var_uint();
    assert!(read(&[]).is_err());
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[1]), Ok(1));
    assert_eq!(read(&[127]), Ok(127));
    assert!(read(&[128]).is_err());
    assert_eq!(read(&[128, 1]), Ok(128));
    assert_eq!(read(&[172, 2]), Ok(300));
    assert_eq!(read(&[255, 255, 255, 255, 15]), Ok(u32::MAX));
    assert_eq!(
        read(&[255, 255, 255, 255, 16]),
        Err(WireError::VarintOverflow { offset: 0, bits: 32 })
    );
    assert_eq!(
        read(&[255, 255, 255, 255, 255, 1]),
        Err(WireError::VarintOverflow { offset: 0, bits: 32 })
    );
}

#[test]
fn read_var_int() {
    let read = |bytes| ByteBuffer::new(bytes).read_var_int();
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[1]), Ok(-1));
    assert_eq!(read(&[2]), Ok(1));
    assert_eq!(read(&[3]), Ok(-2));
    assert_eq!(read(&[127]), Ok(-64));
    assert_eq!(read(&[128, 1]), Ok(64));
    assert_eq!(read(&[254, 255, 255, 255, 15]), Ok(i32::MAX));
    assert_eq!(read(&[255, 255, 255, 255, 15]), Ok(i32::MIN));
}

#[test]
fn read_var_uint64() {
    let read = |bytes| ByteBuffer::new(bytes).read_var_uint64();
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[172, 2]), Ok(300));
    assert_eq!(
        read(&[255, 255, 255, 255, 255, 255, 255, 255, 255, 1]),
        Ok(u64::MAX)
    );
    assert_eq!(
        read(&[255, 255, 255, 255, 255, 255, 255, 255, 255, 2]),
        Err(WireError::VarintOverflow { offset: 0, bits: 64 })
    );
}

#[test]
fn read_var_int64() {
    let read = |bytes| ByteBuffer::new(bytes).read_var_int64();
    assert_eq!(read(&[3]), Ok(-2));
    assert_eq!(
        read(&[254, 255, 255, 255, 255, 255, 255, 255, 255, 1]),
        Ok(i64::MAX)
    );
    assert_eq!(
        read(&[255, 255, 255, 255, 255, 255, 255, 255, 255, 1]),
        Ok(i64::MIN)
    );
}

#[test]
fn read_fixed_is_big_endian() {
    let mut bb = ByteBuffer::new(&[0, 0, 1, 2, 0xFF, 0xFF, 0xFF, 0xFE, 0x3F, 0xF0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(bb.read_fixed32(), Ok(258));
    assert_eq!(bb.read_sfixed32(), Ok(-2));
    assert_eq!(bb.read_double(), Ok(1.0));
    assert!(bb.read_fixed64().is_err());
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string();
    assert_eq!(read(&[0]), Ok(String::new()));
    assert_eq!(read(&[3, 97, 98, 99]), Ok("abc".to_owned()));
    assert_eq!(
        read(&[4, 97]),
        Err(WireError::LengthOutOfBounds { offset: 0, len: 4, remaining: 1 })
    );
    assert_eq!(read(&[2, 0xC3, 0x28]), Err(WireError::InvalidUtf8 { offset: 0 }));
}

#[test]
fn read_frame_isolates_payload() {
    let mut bb = ByteBuffer::new(&[2, 7, 8, 9]);
    let mut frame = bb.read_frame().unwrap();
    assert_eq!(frame.read_byte(), Ok(7));
    assert_eq!(bb.read_byte(), Ok(9));
    assert_eq!(frame.read_byte(), Ok(8));
    assert!(frame.is_empty());
}

#[test]
fn skip_each_kind() {
    let mut bb = ByteBuffer::new(&[
        0xAC, 0x02,             // varint
        0, 0, 0, 1,             // fixed32
        0, 0, 0, 0, 0, 0, 0, 1, // fixed64
        2, 0xAA, 0xBB,          // bytes
        1, 0,                   // nested
        42,
    ]);
    bb.skip(WireKind::UnsignedVarint).unwrap();
    bb.skip(WireKind::Fixed32).unwrap();
    bb.skip(WireKind::Fixed64).unwrap();
    bb.skip(WireKind::LengthDelimitedBytes).unwrap();
    bb.skip(WireKind::LengthDelimitedNested).unwrap();
    assert_eq!(bb.read_byte(), Ok(42));
}

#[test]
fn read_message_frame_limits_nesting() {
    let nested = |levels: usize| {
        let mut data = Vec::new();
        for _ in 0..levels {
            let mut bb = ByteBufferMut::new();
            bb.write_byte_array(&data);
            data = bb.data();
        }
        data
    };

    let data = nested(RECURSION_LIMIT);
    let mut bb = ByteBuffer::new(&data);
    for depth in 1..=RECURSION_LIMIT {
        bb = bb.read_message_frame().unwrap();
        assert_eq!(bb.depth(), depth);
    }
    assert!(bb.is_empty());

    let data = nested(RECURSION_LIMIT + 1);
    let mut bb = ByteBuffer::new(&data);
    for _ in 0..RECURSION_LIMIT {
        bb = bb.read_message_frame().unwrap();
    }
    assert!(matches!(
        bb.read_message_frame(),
        Err(WireError::RecursionLimit { limit: RECURSION_LIMIT, .. })
    ));

    // Sequence frames stay at their parent's depth.
    let frame = ByteBuffer::new(&[2, 1, 0]).read_frame().unwrap();
    assert_eq!(frame.depth(), 0);
}

/// A polyglot byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// let mut bb = polyglot_schema::ByteBufferMut::new();
/// bb.write_string("🍕");
/// bb.write_float(123.456);
/// assert_eq!(bb.data(), [4, 240, 159, 141, 149, 0x42, 0xF6, 0xE9, 0x79]);
/// ```
///
#[derive(Debug, Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store. Use this
    /// to get the data out when you're done writing to the buffer.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a boolean value (presence flags use this too).
    pub fn write_bool(&mut self, value: bool) {
        self.data.push(u8::from(value));
    }

    /// Write a byte to the end of the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a raw byte slice to the end of the buffer, with no length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    /// Write a variable-length unsigned 32-bit integer to the end of the buffer.
    pub fn write_var_uint(&mut self, value: u32) {
        self.write_var_uint64(value as u64);
    }

    /// Write a zigzag-encoded signed 32-bit integer to the end of the buffer.
    pub fn write_var_int(&mut self, value: i32) {
        self.write_var_uint(((value << 1) ^ (value >> 31)) as u32);
    }

    /// Write a variable-length unsigned 64-bit integer to the end of the buffer.
    pub fn write_var_uint64(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.data.push((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.data.push(value as u8);
    }

    /// Write a zigzag-encoded signed 64-bit integer to the end of the buffer.
    pub fn write_var_int64(&mut self, value: i64) {
        self.write_var_uint64(((value << 1) ^ (value >> 63)) as u64);
    }

    pub fn write_fixed32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_sfixed32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_fixed64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_sfixed64(&mut self, value: i64) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_float(&mut self, value: f32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_double(&mut self, value: f64) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a length or element count.
    pub fn write_len(&mut self, len: usize) {
        self.write_var_uint64(len as u64);
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_byte_array(value.as_bytes());
    }

    /// Write a length-prefixed byte array.
    pub fn write_byte_array(&mut self, value: &[u8]) {
        self.write_len(value.len());
        self.data.extend_from_slice(value);
    }

    /// Writes whatever `body` writes, prefixed by its byte length.
    pub fn write_frame<F>(&mut self, body: F)
    where
        F: FnOnce(&mut ByteBufferMut),
    {
        let mut frame = ByteBufferMut::new();
        body(&mut frame);
        self.write_byte_array(&frame.data);
    }

    /// Writes a nested message as a length-delimited frame.
    pub fn write_message<T: Encode + ?Sized>(&mut self, value: &T) {
        self.write_frame(|bb| value.encode_bb(bb));
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_bool() {
    assert_eq!(write_once(|bb| bb.write_bool(false)), [0]);
    assert_eq!(write_once(|bb| bb.write_bool(true)), [1]);
}

#[test]
fn write_var_uint() {
    assert_eq!(write_once(|bb| bb.write_var_uint(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_var_uint(127)), [127]);
    assert_eq!(write_once(|bb| bb.write_var_uint(128)), [128, 1]);
    assert_eq!(write_once(|bb| bb.write_var_uint(300)), [172, 2]);
    assert_eq!(write_once(|bb| bb.write_var_uint(u32::MAX)), [255, 255, 255, 255, 15]);
}

#[test]
fn write_var_int() {
    assert_eq!(write_once(|bb| bb.write_var_int(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_var_int(-1)), [1]);
    assert_eq!(write_once(|bb| bb.write_var_int(1)), [2]);
    assert_eq!(write_once(|bb| bb.write_var_int(-64)), [127]);
    assert_eq!(write_once(|bb| bb.write_var_int(64)), [128, 1]);
    assert_eq!(write_once(|bb| bb.write_var_int(i32::MIN)), [255, 255, 255, 255, 15]);
}

#[test]
fn write_var_uint64_uses_ten_bytes_at_most() {
    assert_eq!(
        write_once(|bb| bb.write_var_uint64(u64::MAX)),
        [255, 255, 255, 255, 255, 255, 255, 255, 255, 1]
    );
    assert_eq!(
        write_once(|bb| bb.write_var_int64(i64::MIN)),
        [255, 255, 255, 255, 255, 255, 255, 255, 255, 1]
    );
}

#[test]
fn write_fixed_is_big_endian() {
    assert_eq!(write_once(|bb| bb.write_fixed32(258)), [0, 0, 1, 2]);
    assert_eq!(write_once(|bb| bb.write_sfixed32(-2)), [0xFF, 0xFF, 0xFF, 0xFE]);
    assert_eq!(write_once(|bb| bb.write_double(1.0)), [0x3F, 0xF0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(write_once(|bb| bb.write_float(-0.0)), [0x80, 0, 0, 0]);
}

#[test]
fn write_string() {
    assert_eq!(write_once(|bb| bb.write_string("")), [0]);
    assert_eq!(write_once(|bb| bb.write_string("abc")), [3, 97, 98, 99]);
    assert_eq!(write_once(|bb| bb.write_string("🍕")), [4, 240, 159, 141, 149]);
}

#[test]
fn write_frame_prefixes_byte_length() {
    let mut bb = ByteBufferMut::new();
    bb.write_frame(|bb| {
        bb.write_string("ab");
        bb.write_var_uint(300);
    });
    assert_eq!(bb.data(), [5, 2, 97, 98, 172, 2]);
}

#[test]
fn write_then_read_sequence() {
    let mut bb = ByteBufferMut::new();
    bb.write_float(123.456);
    bb.write_string("🍕");
    bb.write_var_int64(-123456789);
    bb.write_sfixed64(i64::MIN);
    let data = bb.data();

    let mut bb = ByteBuffer::new(&data);
    assert_eq!(bb.read_float(), Ok(123.456));
    assert_eq!(bb.read_string(), Ok("🍕".to_owned()));
    assert_eq!(bb.read_var_int64(), Ok(-123456789));
    assert_eq!(bb.read_sfixed64(), Ok(i64::MIN));
    assert!(bb.is_empty());
}
