use std::cmp::Ordering;
use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::read::{malformed, BufferedRead};

pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Largest class file version accepted by this crate (Java 1.4).
pub const MAX_SUPPORTED_VERSION: ClassVersion = ClassVersion::new(48, 0);

pub fn check_magic_number<T: Read>(buffer: &mut T) -> io::Result<()> {
    let magic = buffer.read_u32::<BigEndian>()?;
    if magic != CLASS_MAGIC {
        return malformed(format!("bad magic number 0x{:08X}", magic));
    }
    Ok(())
}

/// Class file version pair. The file stores the minor version first, but
/// ordering is by major version then minor.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ClassVersion {
    pub major: u16,
    pub minor: u16,
}

impl ClassVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        ClassVersion { major, minor }
    }
}

impl BufferedRead for ClassVersion {
    fn read<T: Read>(buffer: &mut T) -> io::Result<Self> {
        let minor = buffer.read_u16::<BigEndian>()?;
        let major = buffer.read_u16::<BigEndian>()?;
        Ok(ClassVersion { major, minor })
    }

    fn write<T: Write>(&self, buffer: &mut T) -> io::Result<()> {
        buffer.write_u16::<BigEndian>(self.minor)?;
        buffer.write_u16::<BigEndian>(self.major)
    }
}

impl PartialOrd for ClassVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClassVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.major.cmp(&other.major) {
            Ordering::Equal => self.minor.cmp(&other.minor),
            x => x,
        }
    }
}

impl std::fmt::Display for ClassVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
