use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::constant::ConstantPool;
use crate::read::BufferedRead;

/// An attribute as it appears in the file: a name reference and an opaque
/// body. Attribute layouts are rigid and small, so bodies are only decoded
/// when a consumer asks for a specific typed view (`Code`, `ConstantValue`,
/// ...). Attributes nobody recognizes ride along untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub fn name<'a>(&self, pool: &'a ConstantPool) -> io::Result<&'a str> {
        pool.text(self.name_index)
    }

    pub fn parse_as<T: BufferedRead>(&self) -> io::Result<T> {
        T::from_slice(&self.info)
    }
}

impl BufferedRead for AttributeInfo {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        let name_index = buffer.read_u16::<BigEndian>()?;
        let length = buffer.read_u32::<BigEndian>()?;

        let mut info = vec![0u8; length as usize];
        buffer.read_exact(&mut info)?;

        Ok(AttributeInfo { name_index, info })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_u16::<BigEndian>(self.name_index)?;
        buffer.write_u32::<BigEndian>(self.info.len() as u32)?;
        buffer.write_all(&self.info)
    }
}

/// Find and decode an attribute by name from a method or field's attribute
/// list.
pub fn find_attribute<T: BufferedRead>(
    attributes: &[AttributeInfo],
    pool: &ConstantPool,
    name: &str,
) -> io::Result<Option<T>> {
    for attribute in attributes {
        if attribute.name(pool)? == name {
            return attribute.parse_as().map(Some);
        }
    }

    Ok(None)
}

/// Body of a `Code` attribute. The exception table is decoded and retained
/// but never consulted during dispatch; this interpreter has no exception
/// handler transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionRange>,
    pub attributes: Vec<AttributeInfo>,
}

impl BufferedRead for CodeAttribute {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        let max_stack = buffer.read_u16::<BigEndian>()?;
        let max_locals = buffer.read_u16::<BigEndian>()?;

        let code_length = buffer.read_u32::<BigEndian>()?;
        let mut code = vec![0u8; code_length as usize];
        buffer.read_exact(&mut code)?;

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table: <Vec<ExceptionRange>>::read(buffer)?,
            attributes: <Vec<AttributeInfo>>::read(buffer)?,
        })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_u16::<BigEndian>(self.max_stack)?;
        buffer.write_u16::<BigEndian>(self.max_locals)?;
        buffer.write_u32::<BigEndian>(self.code.len() as u32)?;
        buffer.write_all(&self.code)?;
        self.exception_table.write(buffer)?;
        self.attributes.write(buffer)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExceptionRange {
    pub try_start: u16,
    pub try_end: u16,
    pub catch_start: u16,
    pub catch_type: u16,
}

impl BufferedRead for ExceptionRange {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        Ok(ExceptionRange {
            try_start: buffer.read_u16::<BigEndian>()?,
            try_end: buffer.read_u16::<BigEndian>()?,
            catch_start: buffer.read_u16::<BigEndian>()?,
            catch_type: buffer.read_u16::<BigEndian>()?,
        })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_u16::<BigEndian>(self.try_start)?;
        buffer.write_u16::<BigEndian>(self.try_end)?;
        buffer.write_u16::<BigEndian>(self.catch_start)?;
        buffer.write_u16::<BigEndian>(self.catch_type)
    }
}

/// `ConstantValue` attribute: a single pool index holding the initial value
/// of a final static field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConstantValue {
    pub index: u16,
}

impl BufferedRead for ConstantValue {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        Ok(ConstantValue {
            index: buffer.read_u16::<BigEndian>()?,
        })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_u16::<BigEndian>(self.index)
    }
}

/// `Exceptions` attribute: pool indices of the declared throwable classes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exceptions {
    pub index_table: Vec<u16>,
}

impl BufferedRead for Exceptions {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        Ok(Exceptions {
            index_table: <Vec<u16>>::read(buffer)?,
        })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        self.index_table.write(buffer)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub index: u16,
}

impl BufferedRead for SourceFile {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        Ok(SourceFile {
            index: buffer.read_u16::<BigEndian>()?,
        })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_u16::<BigEndian>(self.index)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

impl BufferedRead for LineNumber {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        Ok(LineNumber {
            start_pc: buffer.read_u16::<BigEndian>()?,
            line_number: buffer.read_u16::<BigEndian>()?,
        })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_u16::<BigEndian>(self.start_pc)?;
        buffer.write_u16::<BigEndian>(self.line_number)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineNumberTable {
    pub table: Vec<LineNumber>,
}

impl BufferedRead for LineNumberTable {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        Ok(LineNumberTable {
            table: <Vec<LineNumber>>::read(buffer)?,
        })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        self.table.write(buffer)
    }
}

/// Wrap a typed attribute body back into an [`AttributeInfo`] for the given
/// name index. Used by the write side and the test assemblers.
pub fn pack_attribute<T: BufferedRead>(name_index: u16, body: &T) -> io::Result<AttributeInfo> {
    Ok(AttributeInfo {
        name_index,
        info: body.to_bytes()?,
    })
}
