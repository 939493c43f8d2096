use std::io::{self, Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::attribute::{find_attribute, AttributeInfo, CodeAttribute, ConstantValue};
use crate::constant::ConstantPool;
use crate::descriptor::FieldDescriptor;
use crate::read::BufferedRead;
use crate::version::{check_magic_number, ClassVersion};

bitflags! {
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const SYNCHRONIZED = 0x0020;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

impl BufferedRead for AccessFlags {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        // Unknown bits are dropped rather than rejected; version 48 files in
        // the wild carry flags this set predates.
        Ok(AccessFlags::from_bits_truncate(
            buffer.read_u16::<BigEndian>()?,
        ))
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_u16::<BigEndian>(self.bits())
    }
}

/// In-memory image of one `.class` file.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub version: ClassVersion,
    pub constants: ConstantPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// Decode a class image. Beyond the grammar itself this validates only
    /// the magic number; version acceptance and the super-class
    /// circularity check belong to the loader's verify step.
    pub fn parse(data: &[u8]) -> io::Result<Self> {
        let mut buffer = Cursor::new(data);
        let class = Self::read(&mut buffer)?;

        trace!(
            "parsed class {} ({} constants, {} methods)",
            class.name()?,
            class.constants.len(),
            class.methods.len()
        );

        Ok(class)
    }

    pub fn name(&self) -> io::Result<&str> {
        self.constants.class_name(self.this_class)
    }

    /// `None` only for the hierarchy root (`super_class` of zero).
    pub fn super_name(&self) -> io::Result<Option<&str>> {
        if self.super_class == 0 {
            return Ok(None);
        }

        self.constants.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> io::Result<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|&index| self.constants.class_name(index))
            .collect()
    }

    pub fn get_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|method| {
            matches!(method.name(&self.constants), Ok(n) if n == name)
                && matches!(method.descriptor(&self.constants), Ok(d) if d == descriptor)
        })
    }

    /// Fields are looked up by name alone; the runtime stores one cell per
    /// field name.
    pub fn get_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find(|field| matches!(field.name(&self.constants), Ok(n) if n == name))
    }
}

impl BufferedRead for ClassFile {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        check_magic_number(buffer)?;

        let version = ClassVersion::read(buffer)?;
        let constants = ConstantPool::read_pool(buffer)?;
        let access_flags = AccessFlags::read(buffer)?;

        let this_class = buffer.read_u16::<BigEndian>()?;
        let super_class = buffer.read_u16::<BigEndian>()?;

        let num_interfaces = buffer.read_u16::<BigEndian>()?;
        let mut interfaces = Vec::with_capacity(num_interfaces as usize);
        for _ in 0..num_interfaces {
            interfaces.push(buffer.read_u16::<BigEndian>()?);
        }

        Ok(ClassFile {
            version,
            constants,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields: <Vec<FieldInfo>>::read(buffer)?,
            methods: <Vec<MethodInfo>>::read(buffer)?,
            attributes: <Vec<AttributeInfo>>::read(buffer)?,
        })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_u32::<BigEndian>(crate::version::CLASS_MAGIC)?;
        self.version.write(buffer)?;
        self.constants.write_pool(buffer)?;
        self.access_flags.write(buffer)?;

        buffer.write_u16::<BigEndian>(self.this_class)?;
        buffer.write_u16::<BigEndian>(self.super_class)?;

        buffer.write_u16::<BigEndian>(self.interfaces.len() as u16)?;
        for interface in &self.interfaces {
            buffer.write_u16::<BigEndian>(*interface)?;
        }

        self.fields.write(buffer)?;
        self.methods.write(buffer)?;
        self.attributes.write(buffer)
    }
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub access: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl FieldInfo {
    pub fn name<'a>(&self, pool: &'a ConstantPool) -> io::Result<&'a str> {
        pool.text(self.name_index)
    }

    pub fn descriptor<'a>(&self, pool: &'a ConstantPool) -> io::Result<&'a str> {
        pool.text(self.descriptor_index)
    }

    pub fn field_type(&self, pool: &ConstantPool) -> io::Result<FieldDescriptor> {
        FieldDescriptor::parse(self.descriptor(pool)?)
    }

    /// Pool index carried by a `ConstantValue` attribute, if the field has
    /// one.
    pub fn constant_value(&self, pool: &ConstantPool) -> io::Result<Option<u16>> {
        let value = find_attribute::<ConstantValue>(&self.attributes, pool, "ConstantValue")?;
        Ok(value.map(|v| v.index))
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }
}

impl BufferedRead for FieldInfo {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        Ok(FieldInfo {
            access: AccessFlags::read(buffer)?,
            name_index: buffer.read_u16::<BigEndian>()?,
            descriptor_index: buffer.read_u16::<BigEndian>()?,
            attributes: <Vec<AttributeInfo>>::read(buffer)?,
        })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        self.access.write(buffer)?;
        buffer.write_u16::<BigEndian>(self.name_index)?;
        buffer.write_u16::<BigEndian>(self.descriptor_index)?;
        self.attributes.write(buffer)
    }
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl MethodInfo {
    pub fn name<'a>(&self, pool: &'a ConstantPool) -> io::Result<&'a str> {
        pool.text(self.name_index)
    }

    pub fn descriptor<'a>(&self, pool: &'a ConstantPool) -> io::Result<&'a str> {
        pool.text(self.descriptor_index)
    }

    /// Decode the method's `Code` attribute. `None` for `abstract` and
    /// `native` methods, which carry none.
    pub fn code(&self, pool: &ConstantPool) -> io::Result<Option<CodeAttribute>> {
        find_attribute(&self.attributes, pool, "Code")
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.access.contains(AccessFlags::ABSTRACT)
    }
}

impl BufferedRead for MethodInfo {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        Ok(MethodInfo {
            access: AccessFlags::read(buffer)?,
            name_index: buffer.read_u16::<BigEndian>()?,
            descriptor_index: buffer.read_u16::<BigEndian>()?,
            attributes: <Vec<AttributeInfo>>::read(buffer)?,
        })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        self.access.write(buffer)?;
        buffer.write_u16::<BigEndian>(self.name_index)?;
        buffer.write_u16::<BigEndian>(self.descriptor_index)?;
        self.attributes.write(buffer)
    }
}
