use std::io::{self, Read, Write};
use std::ops::Deref;
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

use crate::read::{malformed, BufferedRead};

/// Constant pool tags of the version 48 format. Later additions
/// (MethodHandle, Dynamic, Module, ...) are treated as malformed input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum ConstantTag {
    Utf8 = 1,
    Int = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Decoded from the JVM's modified UTF-8 on read.
    Utf8(String),
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },

    /// Occupies the second index slot of a `Long`/`Double` entry. The format
    /// burns that slot, so referencing it is always an error.
    Placeholder,
}

impl Constant {
    fn read_entry<T: Read>(buffer: &mut T) -> io::Result<Self> {
        let tag = buffer.read_u8()?;
        let tag = match ConstantTag::from_u8(tag) {
            Some(v) => v,
            None => return malformed(format!("unknown constant pool tag {}", tag)),
        };

        Ok(match tag {
            ConstantTag::Utf8 => {
                let length = buffer.read_u16::<BigEndian>()?;
                let mut bytes = vec![0u8; length as usize];
                buffer.read_exact(&mut bytes)?;

                match cesu8::from_java_cesu8(&bytes) {
                    Ok(text) => Constant::Utf8(text.into_owned()),
                    Err(_) => return malformed("Utf8 constant is not valid modified UTF-8"),
                }
            }
            ConstantTag::Int => Constant::Int(buffer.read_i32::<BigEndian>()?),
            ConstantTag::Float => Constant::Float(buffer.read_f32::<BigEndian>()?),
            ConstantTag::Long => Constant::Long(buffer.read_i64::<BigEndian>()?),
            ConstantTag::Double => Constant::Double(buffer.read_f64::<BigEndian>()?),
            ConstantTag::Class => Constant::Class {
                name_index: buffer.read_u16::<BigEndian>()?,
            },
            ConstantTag::String => Constant::String {
                string_index: buffer.read_u16::<BigEndian>()?,
            },
            ConstantTag::FieldRef => Constant::FieldRef {
                class_index: buffer.read_u16::<BigEndian>()?,
                name_and_type_index: buffer.read_u16::<BigEndian>()?,
            },
            ConstantTag::MethodRef => Constant::MethodRef {
                class_index: buffer.read_u16::<BigEndian>()?,
                name_and_type_index: buffer.read_u16::<BigEndian>()?,
            },
            ConstantTag::InterfaceMethodRef => Constant::InterfaceMethodRef {
                class_index: buffer.read_u16::<BigEndian>()?,
                name_and_type_index: buffer.read_u16::<BigEndian>()?,
            },
            ConstantTag::NameAndType => Constant::NameAndType {
                name_index: buffer.read_u16::<BigEndian>()?,
                descriptor_index: buffer.read_u16::<BigEndian>()?,
            },
        })
    }

    fn write_entry<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        match self {
            Constant::Utf8(text) => {
                buffer.write_u8(ConstantTag::Utf8 as u8)?;
                let bytes = cesu8::to_java_cesu8(text);
                buffer.write_u16::<BigEndian>(bytes.len() as u16)?;
                buffer.write_all(&bytes)
            }
            Constant::Int(value) => {
                buffer.write_u8(ConstantTag::Int as u8)?;
                buffer.write_i32::<BigEndian>(*value)
            }
            Constant::Float(value) => {
                buffer.write_u8(ConstantTag::Float as u8)?;
                buffer.write_f32::<BigEndian>(*value)
            }
            Constant::Long(value) => {
                buffer.write_u8(ConstantTag::Long as u8)?;
                buffer.write_i64::<BigEndian>(*value)
            }
            Constant::Double(value) => {
                buffer.write_u8(ConstantTag::Double as u8)?;
                buffer.write_f64::<BigEndian>(*value)
            }
            Constant::Class { name_index } => {
                buffer.write_u8(ConstantTag::Class as u8)?;
                buffer.write_u16::<BigEndian>(*name_index)
            }
            Constant::String { string_index } => {
                buffer.write_u8(ConstantTag::String as u8)?;
                buffer.write_u16::<BigEndian>(*string_index)
            }
            Constant::FieldRef { class_index, name_and_type_index } => {
                buffer.write_u8(ConstantTag::FieldRef as u8)?;
                buffer.write_u16::<BigEndian>(*class_index)?;
                buffer.write_u16::<BigEndian>(*name_and_type_index)
            }
            Constant::MethodRef { class_index, name_and_type_index } => {
                buffer.write_u8(ConstantTag::MethodRef as u8)?;
                buffer.write_u16::<BigEndian>(*class_index)?;
                buffer.write_u16::<BigEndian>(*name_and_type_index)
            }
            Constant::InterfaceMethodRef { class_index, name_and_type_index } => {
                buffer.write_u8(ConstantTag::InterfaceMethodRef as u8)?;
                buffer.write_u16::<BigEndian>(*class_index)?;
                buffer.write_u16::<BigEndian>(*name_and_type_index)
            }
            Constant::NameAndType { name_index, descriptor_index } => {
                buffer.write_u8(ConstantTag::NameAndType as u8)?;
                buffer.write_u16::<BigEndian>(*name_index)?;
                buffer.write_u16::<BigEndian>(*descriptor_index)
            }
            // Placeholders have no on-disk form; the preceding wide entry
            // accounts for their slot.
            Constant::Placeholder => Ok(()),
        }
    }

    /// True for entries that consume two index slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// Cheaply clonable view over a class's constants, addressed by the format's
/// 1-based indices. Cross references are only validated when followed, as
/// the interpreter touches most entries lazily.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    pool: Arc<[Constant]>,
}

impl ConstantPool {
    pub fn read_pool<T: Read>(buffer: &mut T) -> io::Result<Self> {
        let count = buffer.read_u16::<BigEndian>()?;
        if count == 0 {
            return malformed("constant pool count of zero");
        }

        let mut pool = Vec::with_capacity(count as usize - 1);
        while pool.len() + 1 < count as usize {
            let entry = Constant::read_entry(buffer)?;
            let wide = entry.is_wide();
            pool.push(entry);

            if wide {
                pool.push(Constant::Placeholder);
            }
        }

        if pool.len() + 1 != count as usize {
            return malformed("wide constant overruns the declared pool count");
        }

        trace!("read {} constant pool entries", pool.len());
        Ok(ConstantPool { pool: pool.into() })
    }

    pub fn write_pool<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_u16::<BigEndian>(self.pool.len() as u16 + 1)?;
        for entry in self.pool.iter() {
            entry.write_entry(buffer)?;
        }
        Ok(())
    }

    /// Fetch by 1-based index. `None` for index zero, out-of-range indices,
    /// and the dead slot after a `Long`/`Double`.
    pub fn get(&self, index: u16) -> Option<&Constant> {
        match self.pool.get(usize::from(index).checked_sub(1)?) {
            Some(Constant::Placeholder) => None,
            entry => entry,
        }
    }

    pub fn try_get(&self, index: u16) -> io::Result<&Constant> {
        match self.get(index) {
            Some(v) => Ok(v),
            None => malformed(format!("invalid constant pool index {}", index)),
        }
    }

    pub fn text(&self, index: u16) -> io::Result<&str> {
        match self.try_get(index)? {
            Constant::Utf8(text) => Ok(text),
            x => malformed(format!("expected Utf8 at pool index {}, found {:?}", index, x)),
        }
    }

    pub fn class_name(&self, index: u16) -> io::Result<&str> {
        match self.try_get(index)? {
            Constant::Class { name_index } => self.text(*name_index),
            x => malformed(format!("expected Class at pool index {}, found {:?}", index, x)),
        }
    }

    pub fn name_and_type(&self, index: u16) -> io::Result<(&str, &str)> {
        match self.try_get(index)? {
            Constant::NameAndType { name_index, descriptor_index } => {
                Ok((self.text(*name_index)?, self.text(*descriptor_index)?))
            }
            x => malformed(format!(
                "expected NameAndType at pool index {}, found {:?}",
                index, x
            )),
        }
    }

    /// Resolve a `Fieldref`/`Methodref`/`InterfaceMethodref` entry into
    /// `(class name, member name, descriptor)`.
    pub fn element_ref(&self, index: u16) -> io::Result<(&str, &str, &str)> {
        let (class_index, name_and_type_index) = match self.try_get(index)? {
            Constant::FieldRef { class_index, name_and_type_index }
            | Constant::MethodRef { class_index, name_and_type_index }
            | Constant::InterfaceMethodRef { class_index, name_and_type_index } => {
                (*class_index, *name_and_type_index)
            }
            x => {
                return malformed(format!(
                    "expected a member reference at pool index {}, found {:?}",
                    index, x
                ))
            }
        };

        let (name, descriptor) = self.name_and_type(name_and_type_index)?;
        Ok((self.class_name(class_index)?, name, descriptor))
    }
}

impl From<Vec<Constant>> for ConstantPool {
    fn from(pool: Vec<Constant>) -> Self {
        ConstantPool { pool: pool.into() }
    }
}

impl Deref for ConstantPool {
    type Target = [Constant];

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
