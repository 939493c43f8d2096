use std::io::{self, Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// Streamlines reading and writing the structures of the class file format.
/// The format only ever uses big-endian encoding, so all primitives are read
/// that way without further ceremony.
pub trait BufferedRead: Sized {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self>;

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()>;

    fn from_slice<T: AsRef<[u8]>>(slice: T) -> io::Result<Self> {
        let mut buffer = Cursor::new(slice.as_ref());
        Self::read(&mut buffer)
    }

    fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        Ok(buffer)
    }
}

/// Repetitions in the class file are almost always a u16 count followed by
/// that many entries. The constant pool is the one structure with its own
/// counting rules and is handled separately in [`crate::constant`].
impl<T: BufferedRead> BufferedRead for Vec<T> {
    fn read<B: Read>(buffer: &mut B) -> io::Result<Self> {
        let count = buffer.read_u16::<BigEndian>()?;
        let mut vec = Vec::with_capacity(count as usize);

        for _ in 0..count {
            vec.push(T::read(buffer)?);
        }

        Ok(vec)
    }

    fn write<B: Write>(&self, buffer: &mut B) -> io::Result<()> {
        buffer.write_u16::<BigEndian>(self.len() as u16)?;

        for value in self {
            value.write(buffer)?;
        }

        Ok(())
    }
}

impl BufferedRead for u8 {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        buffer.read_u8()
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_u8(*self)
    }
}

impl BufferedRead for i8 {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        buffer.read_i8()
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_i8(*self)
    }
}

macro_rules! impl_primitive {
    ($type:ty: $read:ident, $write:ident) => {
        impl BufferedRead for $type {
            fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
                buffer.$read::<BigEndian>()
            }

            fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
                buffer.$write::<BigEndian>(*self)
            }
        }
    };
}

impl_primitive!(u16: read_u16, write_u16);
impl_primitive!(u32: read_u32, write_u32);
impl_primitive!(u64: read_u64, write_u64);
impl_primitive!(i16: read_i16, write_i16);
impl_primitive!(i32: read_i32, write_i32);
impl_primitive!(i64: read_i64, write_i64);
impl_primitive!(f32: read_f32, write_f32);
impl_primitive!(f64: read_f64, write_f64);

/// Malformed-structure errors all report through the same [`io::ErrorKind`]
/// so callers can tell format damage apart from plain I/O failures.
pub fn malformed<T, S: Into<String>>(message: S) -> io::Result<T> {
    Err(io::Error::new(io::ErrorKind::InvalidData, message.into()))
}
