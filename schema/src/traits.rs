use crate::{
    bb::{ByteBuffer, ByteBufferMut},
    error::WireError,
};

/// Implemented by generated message types to write their polyglot body.
pub trait Encode {
    /// Writes the message body (no outer length prefix) to the end of `bb`.
    fn encode_bb(&self, bb: &mut ByteBufferMut);

    fn encode(&self) -> Vec<u8> {
        let mut bb = ByteBufferMut::new();
        self.encode_bb(&mut bb);
        bb.data()
    }
}

/// Implemented by generated message types to read their polyglot body.
///
/// Decoding stops quietly when the buffer runs out (fields missing from an
/// older writer keep their defaults) and leaves any unread tail alone (fields
/// appended by a newer writer).
pub trait Decode: Sized {
    fn decode_bb(bb: &mut ByteBuffer<'_>) -> Result<Self, WireError>;

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        Self::decode_bb(&mut ByteBuffer::new(bytes))
    }
}
