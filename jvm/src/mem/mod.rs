pub mod fields;
pub mod frame;
pub mod heap;
pub mod method_area;
pub mod slot;

pub use fields::{FieldCell, FieldTable, FieldValue, SlotValue};
pub use frame::{Frame, OperandStack};
pub use heap::{ArrayData, ArrayType, Heap, HeapEntry, Instance, JavaArray, Ref};
pub use method_area::{ClassId, MethodArea, RuntimeClass};
pub use slot::Slot;
