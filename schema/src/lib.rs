//! Runtime support for the polyglot wire format.
//!
//! Generated code only needs [`ByteBuffer`], [`ByteBufferMut`] and the
//! [`Encode`] / [`Decode`] traits. The [`wire`] module holds the primitive
//! table that the compiler consults when it plans a codec.
//!
//! ```
//! use polyglot_schema::*;
//!
//! let mut bb = ByteBufferMut::new();
//! bb.write_var_int(-2);
//! bb.write_bool(false);
//! bb.write_fixed32(7);
//! let data = bb.data();
//! assert_eq!(data, [3, 0, 0, 0, 0, 7]);
//!
//! let mut bb = ByteBuffer::new(&data);
//! assert_eq!(bb.read_var_int(), Ok(-2));
//! assert_eq!(bb.read_bool(), Ok(false));
//! assert_eq!(bb.read_fixed32(), Ok(7));
//! ```

pub mod bb;
pub mod error;
pub mod traits;
pub mod wire;

pub use bb::*;
pub use error::WireError;
pub use traits::{Decode, Encode};
pub use wire::*;
