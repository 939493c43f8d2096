//! Field storage for objects and class statics. Each named field owns one
//! cell whose width follows its descriptor: one byte for `B`/`C`/`Z`, two
//! for `S`, four for `I`/`F` and references, eight for `J`/`D`.

use class_format::descriptor::StorageWidth;
use class_format::FieldDescriptor;

use crate::mem::slot::{self, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Byte(u8),
    Half(u16),
    Word(u32),
    Wide(u64),
}

/// A field value as it moves across the operand stack: one slot, or a
/// high/low pair for category-2 types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotValue {
    Word(Slot),
    Pair { high: Slot, low: Slot },
}

impl FieldValue {
    pub fn zeroed(descriptor: &FieldDescriptor) -> Self {
        match descriptor.storage_width() {
            StorageWidth::Byte => FieldValue::Byte(0),
            StorageWidth::Half => FieldValue::Half(0),
            StorageWidth::Word => FieldValue::Word(0),
            StorageWidth::Wide => FieldValue::Wide(0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldCell {
    pub name: String,
    pub descriptor: FieldDescriptor,
    pub value: FieldValue,
}

impl FieldCell {
    pub fn new(name: String, descriptor: FieldDescriptor) -> Self {
        let value = FieldValue::zeroed(&descriptor);
        FieldCell { name, descriptor, value }
    }

    /// Widen the cell back to stack slots. Signed widths sign-extend;
    /// `char` and `boolean` zero-extend.
    pub fn load(&self) -> SlotValue {
        match self.value {
            FieldValue::Byte(raw) => {
                let widened = match self.descriptor {
                    FieldDescriptor::Byte => raw as i8 as i32,
                    _ => raw as i32,
                };
                SlotValue::Word(slot::from_int(widened))
            }
            FieldValue::Half(raw) => SlotValue::Word(slot::from_int(raw as i16 as i32)),
            FieldValue::Word(raw) => SlotValue::Word(raw),
            FieldValue::Wide(raw) => {
                let (low, high) = slot::from_long(raw as i64);
                SlotValue::Pair { high, low }
            }
        }
    }

    /// Store stack slots into the cell, truncating to the cell width.
    pub fn store(&mut self, value: SlotValue) {
        self.value = match (self.value, value) {
            (FieldValue::Byte(_), SlotValue::Word(slot)) => {
                let raw = match self.descriptor {
                    FieldDescriptor::Boolean => (slot & 1) as u8,
                    _ => slot as u8,
                };
                FieldValue::Byte(raw)
            }
            (FieldValue::Half(_), SlotValue::Word(slot)) => FieldValue::Half(slot as u16),
            (FieldValue::Word(_), SlotValue::Word(slot)) => FieldValue::Word(slot),
            (FieldValue::Wide(_), SlotValue::Pair { high, low }) => {
                FieldValue::Wide(slot::to_long(high, low) as u64)
            }
            // Width mismatches only arise from malformed descriptors; keep
            // the cell width and take what fits.
            (FieldValue::Wide(_), SlotValue::Word(slot)) => FieldValue::Wide(slot as u64),
            (FieldValue::Byte(_), SlotValue::Pair { low, .. }) => FieldValue::Byte(low as u8),
            (FieldValue::Half(_), SlotValue::Pair { low, .. }) => FieldValue::Half(low as u16),
            (FieldValue::Word(_), SlotValue::Pair { low, .. }) => FieldValue::Word(low),
        };
    }
}

/// Name-keyed field cells for one object or one class's statics.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    cells: Vec<FieldCell>,
}

impl FieldTable {
    pub fn new() -> Self {
        FieldTable { cells: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&FieldCell> {
        self.cells.iter().find(|cell| cell.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldCell> {
        self.cells.iter_mut().find(|cell| cell.name == name)
    }

    /// Insert a zeroed cell unless the name is already present. Shadowed
    /// fields keep the first (most derived) declaration.
    pub fn declare(&mut self, name: &str, descriptor: FieldDescriptor) {
        if self.get(name).is_none() {
            self.cells.push(FieldCell::new(name.to_string(), descriptor));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldCell> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
