use std::fmt::{Debug, Display};

use num_traits::NumCast;

use crate::Datatype;

/// A Rust native type backing one fixed-width [`Datatype`].
///
/// Buffers are always little-endian byte stores; `read_le`/`write_le` are the
/// only way values cross the byte boundary.
pub trait NativeDatatype:
    Copy + Debug + Display + Default + PartialEq + PartialOrd + NumCast + Send + Sync + 'static
{
    /// The datatype tag corresponding to this native type.
    const DATATYPE: Datatype;

    /// The width in bytes of one value.
    const WIDTH: usize = size_of::<Self>();

    /// Decode one value from exactly [`Self::WIDTH`] little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Append the little-endian encoding of `self` to `out`.
    fn write_le(&self, out: &mut Vec<u8>);
}

macro_rules! native_datatype {
    ($T:ty, $tag:ident) => {
        impl NativeDatatype for $T {
            const DATATYPE: Datatype = Datatype::$tag;

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; size_of::<$T>()];
                buf.copy_from_slice(bytes);
                <$T>::from_le_bytes(buf)
            }

            fn write_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

native_datatype!(i8, Int8);
native_datatype!(i16, Int16);
native_datatype!(i32, Int32);
native_datatype!(i64, Int64);
native_datatype!(u8, UInt8);
native_datatype!(u16, UInt16);
native_datatype!(u32, UInt32);
native_datatype!(u64, UInt64);
native_datatype!(f32, Float32);
native_datatype!(f64, Float64);
