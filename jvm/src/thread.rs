//! The single logical thread: a program counter and a stack of activation
//! frames. `pc` is a byte offset into the top frame's code and may sit at
//! -1 between dispatches; the interpreter loop advances it before every
//! fetch, which is what lets frame pushes and staged initializers land on
//! byte zero.

use crate::error::VmError;
use crate::mem::frame::Frame;

#[derive(Debug, Default)]
pub struct Thread {
    pub pc: i64,
    pub frames: Vec<Frame>,
}

impl Thread {
    pub fn new() -> Self {
        Thread {
            pc: 0,
            frames: Vec::new(),
        }
    }

    pub fn top(&self) -> Result<&Frame, VmError> {
        self.frames.last().ok_or(VmError::NoFrame)
    }

    pub fn top_mut(&mut self) -> Result<&mut Frame, VmError> {
        self.frames.last_mut().ok_or(VmError::NoFrame)
    }

    /// Link a new frame as top of stack. The frame records the caller's pc
    /// as its `return_pc`; execution of the callee starts at byte zero on
    /// the next loop advance.
    pub fn push_frame(&mut self, mut frame: Frame) {
        frame.return_pc = self.pc;
        self.frames.push(frame);
        self.pc = -1;
    }

    /// Unlink the top frame and restore the caller's pc.
    pub fn pop_frame(&mut self) -> Result<Frame, VmError> {
        let frame = self.frames.pop().ok_or(VmError::NoFrame)?;
        self.pc = frame.return_pc;
        Ok(frame)
    }

    /// Opcode byte at the current pc.
    pub fn fetch(&self) -> Result<u8, VmError> {
        let frame = self.top()?;
        if self.pc < 0 {
            return Err(VmError::PcOutOfRange(self.pc));
        }

        frame
            .code
            .code
            .get(self.pc as usize)
            .copied()
            .ok_or(VmError::PcOutOfRange(self.pc))
    }

    fn code_byte(&self, offset: i64) -> Result<u8, VmError> {
        let frame = self.top()?;
        let at = self.pc + offset;
        if at < 0 {
            return Err(VmError::PcOutOfRange(at));
        }

        frame
            .code
            .code
            .get(at as usize)
            .copied()
            .ok_or(VmError::PcOutOfRange(at))
    }

    // Operand reads are relative to the opcode at the current pc and do not
    // advance it; handlers commit their operand width once they cannot fail
    // part way any more.

    pub fn operand_u8(&self, offset: i64) -> Result<u8, VmError> {
        self.code_byte(offset)
    }

    pub fn operand_i8(&self, offset: i64) -> Result<i8, VmError> {
        Ok(self.code_byte(offset)? as i8)
    }

    pub fn operand_u16(&self, offset: i64) -> Result<u16, VmError> {
        let high = self.code_byte(offset)?;
        let low = self.code_byte(offset + 1)?;
        Ok(u16::from_be_bytes([high, low]))
    }

    pub fn operand_i16(&self, offset: i64) -> Result<i16, VmError> {
        Ok(self.operand_u16(offset)? as i16)
    }

    pub fn operand_i32(&self, offset: i64) -> Result<i32, VmError> {
        let bytes = [
            self.code_byte(offset)?,
            self.code_byte(offset + 1)?,
            self.code_byte(offset + 2)?,
            self.code_byte(offset + 3)?,
        ];
        Ok(i32::from_be_bytes(bytes))
    }
}
