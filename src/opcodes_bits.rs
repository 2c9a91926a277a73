/// Bit manipulation and shifts
///
/// - BTST/BCHG/BCLR/BSET on a data register work on the whole long (bit mod 32), on
///   memory on a single byte (bit mod 8). Only the zero flag changes.
/// - AS/LS/RO shifts iterate one bit at a time; carry gets the last bit shifted out.
///   There is no extend flag, so ROX behaves like RO.
use crate::error::VmResult;
use crate::instruction::{BitOp, Ea, ShiftCount, ShiftKind};
use crate::registers::Size;
use crate::vm::Vm;

impl Vm {
    pub(crate) fn exec_bit(&mut self, op: BitOp, bit: u32, dst: Ea) -> VmResult<()> {
        let (size, bit) = if dst.mode == 0 {
            (Size::Long, bit % 32)
        } else {
            (Size::Byte, bit % 8)
        };
        let target = self.resolve(dst, size)?;
        let value = self.read_operand(target, size)?;
        let mask = 1u32 << bit;
        self.regs.flags.zero = value & mask == 0;
        let result = match op {
            BitOp::Test => return Ok(()),
            BitOp::Change => value ^ mask,
            BitOp::Clear => value & !mask,
            BitOp::Set => value | mask,
        };
        self.write_operand(target, size, result)
    }

    /// Shift `value` (of `size`) `count` times. Returns the result and the last bit out.
    fn shift_value(kind: ShiftKind, left: bool, size: Size, mut value: u32, count: u32) -> (u32, bool) {
        let msb = size.msb();
        let mask = size.mask();
        let mut carry = false;
        for _ in 0..count {
            match (kind, left) {
                (ShiftKind::Arithmetic | ShiftKind::Logical, true) => {
                    carry = value & msb != 0;
                    value = (value << 1) & mask;
                }
                (ShiftKind::Logical, false) => {
                    carry = value & 1 != 0;
                    value >>= 1;
                }
                (ShiftKind::Arithmetic, false) => {
                    carry = value & 1 != 0;
                    value = (value >> 1) | (value & msb);
                }
                (ShiftKind::Rotate | ShiftKind::RotateExtend, true) => {
                    carry = value & msb != 0;
                    value = ((value << 1) & mask) | carry as u32;
                }
                (ShiftKind::Rotate | ShiftKind::RotateExtend, false) => {
                    carry = value & 1 != 0;
                    value = (value >> 1) | if carry { msb } else { 0 };
                }
            }
        }
        (value & mask, carry)
    }

    pub(crate) fn exec_shift(
        &mut self,
        kind: ShiftKind,
        left: bool,
        size: Size,
        count: ShiftCount,
        reg: u8,
    ) -> VmResult<()> {
        let count = match count {
            ShiftCount::Immediate(n) => n as u32,
            ShiftCount::Register(r) => self.regs.d(r as usize) % 64,
        };
        let r = reg as usize;
        let value = self.regs.read(r, size);
        let (result, carry) = Self::shift_value(kind, left, size, value, count);
        self.regs.write(r, size, result);
        let flags = &mut self.regs.flags;
        flags.carry = carry;
        flags.overflow = false;
        flags.set_nz(result, size);
        Ok(())
    }

    /// Memory shifts always move one word by one bit.
    pub(crate) fn exec_shift_memory(&mut self, kind: ShiftKind, left: bool, dst: Ea) -> VmResult<()> {
        let target = self.resolve(dst, Size::Word)?;
        let value = self.read_operand(target, Size::Word)?;
        let (result, carry) = Self::shift_value(kind, left, Size::Word, value, 1);
        self.write_operand(target, Size::Word, result)?;
        let flags = &mut self.regs.flags;
        flags.carry = carry;
        flags.overflow = false;
        flags.set_nz(result, Size::Word);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_shift_directions() {
        assert_eq!(Vm::shift_value(ShiftKind::Logical, true, Size::Byte, 0x81, 1), (0x02, true));
        assert_eq!(Vm::shift_value(ShiftKind::Logical, false, Size::Byte, 0x81, 1), (0x40, true));
        assert_eq!(Vm::shift_value(ShiftKind::Arithmetic, false, Size::Byte, 0x80, 2), (0xe0, false));
        assert_eq!(Vm::shift_value(ShiftKind::Rotate, true, Size::Word, 0x8001, 1), (0x0003, true));
        assert_eq!(Vm::shift_value(ShiftKind::RotateExtend, false, Size::Byte, 0x01, 1), (0x80, true));
    }

    #[test]
    fn test_zero_count_clears_carry() {
        assert_eq!(Vm::shift_value(ShiftKind::Logical, true, Size::Long, 0xffff_ffff, 0), (0xffff_ffff, false));
    }

    #[test]
    fn test_shift_out_everything() {
        assert_eq!(Vm::shift_value(ShiftKind::Logical, false, Size::Word, 0x8000, 16), (0, true));
    }
}
