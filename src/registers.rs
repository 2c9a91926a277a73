use std::fmt;

/// Top-of-stack value loaded into A7 on (re)start.
pub const STACK_TOP: u32 = 0xfffe;

/// Index of the stack pointer (A7) in the combined register bank.
pub const SP: usize = 15;

/// Operand width, numbered the way the opcode size field encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Byte = 0,
    Word = 1,
    Long = 2,
}

impl Size {
    #[inline]
    pub fn bytes(self) -> u32 {
        1 << (self as u32)
    }

    #[inline]
    pub fn mask(self) -> u32 {
        match self {
            Size::Byte => 0xff,
            Size::Word => 0xffff,
            Size::Long => 0xffff_ffff,
        }
    }

    #[inline]
    pub fn msb(self) -> u32 {
        match self {
            Size::Byte => 0x80,
            Size::Word => 0x8000,
            Size::Long => 0x8000_0000,
        }
    }

    /// Sign-extend the low `self` bits of `value` to 32 bits.
    #[inline]
    pub fn sign_extend(self, value: u32) -> u32 {
        match self {
            Size::Byte => value as u8 as i8 as i32 as u32,
            Size::Word => value as u16 as i16 as i32 as u32,
            Size::Long => value,
        }
    }

    /// Standard two-bit size field (00 byte, 01 word, 10 long).
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits & 3 {
            0 => Some(Size::Byte),
            1 => Some(Size::Word),
            2 => Some(Size::Long),
            _ => None,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Size::Byte => "b",
            Size::Word => "w",
            Size::Long => "l",
        }
    }
}

/// The four condition flags. There is no extend flag on this machine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    pub zero: bool,
    pub negative: bool,
    pub carry: bool,
    pub overflow: bool,
}

impl Flags {
    /// Recompute zero/negative from a result of the given size.
    #[inline]
    pub fn set_nz(&mut self, value: u32, size: Size) {
        self.zero = value & size.mask() == 0;
        self.negative = value & size.msb() != 0;
    }

    /// Flag rule shared by the logical operations and MOVE.
    #[inline]
    pub fn set_logic(&mut self, value: u32, size: Size) {
        self.carry = false;
        self.overflow = false;
        self.set_nz(value, size);
    }

    /// Evaluate one of the sixteen condition codes.
    pub fn condition(&self, code: u8) -> bool {
        match code & 0x0f {
            0x0 => true,
            0x1 => false,
            0x2 => !(self.carry || self.zero),
            0x3 => self.carry || self.zero,
            0x4 => !self.carry,
            0x5 => self.carry,
            0x6 => !self.zero,
            0x7 => self.zero,
            0x8 => !self.overflow,
            0x9 => self.overflow,
            0xa => !self.negative,
            0xb => self.negative,
            0xc => self.negative == self.overflow,
            0xd => self.negative != self.overflow,
            0xe => !self.zero && self.negative == self.overflow,
            _ => self.zero || self.negative != self.overflow,
        }
    }

    /// Apply the low four bits of a CCR image (C, V, Z, N).
    pub fn from_ccr(&mut self, ccr: u8) {
        self.carry = ccr & 0x01 != 0;
        self.overflow = ccr & 0x02 != 0;
        self.zero = ccr & 0x04 != 0;
        self.negative = ccr & 0x08 != 0;
    }

    pub fn to_ccr(&self) -> u8 {
        (self.carry as u8) | (self.overflow as u8) << 1 | (self.zero as u8) << 2 | (self.negative as u8) << 3
    }
}

/// Eight data registers followed by eight address registers, the program counter and the
/// flags. Register numbers 0-7 are D0-D7 and 8-15 are A0-A7, matching the index field of
/// the indexed addressing extension word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    regs: [u32; 16],
    pub pc: u32,
    pub flags: Flags,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    pub fn new() -> Self {
        let mut r = Registers {
            regs: [0; 16],
            pc: 0,
            flags: Flags::default(),
        };
        r.reset();
        r
    }

    /// Zero everything except the stack pointer.
    pub fn reset(&mut self) {
        self.regs = [0; 16];
        self.regs[SP] = STACK_TOP;
        self.pc = 0;
        self.flags = Flags::default();
    }

    /// Read the low `size` bits of register `index` (0-15).
    #[inline]
    pub fn read(&self, index: usize, size: Size) -> u32 {
        self.regs[index & 15] & size.mask()
    }

    /// Write the low `size` bits of register `index`, leaving the upper bits alone.
    #[inline]
    pub fn write(&mut self, index: usize, size: Size, value: u32) {
        let r = &mut self.regs[index & 15];
        *r = (*r & !size.mask()) | (value & size.mask());
    }

    #[inline]
    pub fn d(&self, n: usize) -> u32 {
        self.regs[n & 7]
    }

    #[inline]
    pub fn a(&self, n: usize) -> u32 {
        self.regs[8 + (n & 7)]
    }

    #[inline]
    pub fn set_d(&mut self, n: usize, value: u32) {
        self.regs[n & 7] = value;
    }

    #[inline]
    pub fn set_a(&mut self, n: usize, value: u32) {
        self.regs[8 + (n & 7)] = value;
    }

    #[inline]
    pub fn sp(&self) -> u32 {
        self.regs[SP]
    }

    #[inline]
    pub fn set_sp(&mut self, value: u32) {
        self.regs[SP] = value;
    }

    pub fn bank(&self) -> &[u32; 16] {
        &self.regs
    }

    pub fn set_bank(&mut self, regs: [u32; 16]) {
        self.regs = regs;
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.regs.iter().enumerate() {
            let name = if i < 8 { 'D' } else { 'A' };
            write!(f, "{}{}={:08x}", name, i & 7, v)?;
            f.write_str(if i % 8 == 7 { "\n" } else { " " })?;
        }
        write!(
            f,
            "PC={:06x} Z={} N={} C={} V={}",
            self.pc,
            self.flags.zero as u8,
            self.flags.negative as u8,
            self.flags.carry as u8,
            self.flags.overflow as u8
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_reset_sets_stack_sentinel() {
        let r = Registers::new();
        assert_eq!(r.sp(), STACK_TOP);
        assert_eq!(r.d(0), 0);
        assert_eq!(r.pc, 0);
    }

    #[test]
    fn test_sub_register_views() {
        let mut r = Registers::new();
        r.set_d(3, 0x1234_5678);
        assert_eq!(r.read(3, Size::Byte), 0x78);
        assert_eq!(r.read(3, Size::Word), 0x5678);
        r.write(3, Size::Byte, 0xff);
        assert_eq!(r.d(3), 0x1234_56ff);
        r.write(3, Size::Word, 0x0001);
        assert_eq!(r.d(3), 0x1234_0001);
        r.write(8 + 2, Size::Long, 0xdead_beef);
        assert_eq!(r.a(2), 0xdead_beef);
    }

    #[test]
    fn test_condition_table() {
        let mut f = Flags::default();
        assert!(f.condition(0));
        assert!(!f.condition(1));
        assert!(f.condition(2)); // HI with C=0,Z=0
        f.zero = true;
        assert!(f.condition(7));
        assert!(!f.condition(6));
        assert!(f.condition(3)); // LS
        assert!(f.condition(15)); // LE
        f.zero = false;
        f.negative = true;
        assert!(f.condition(11)); // MI
        assert!(f.condition(13)); // LT
        assert!(!f.condition(12)); // GE
        f.carry = true;
        assert!(f.condition(5));
        assert!(!f.condition(4));
    }

    #[test]
    fn test_ccr_round_trip() {
        let mut f = Flags::default();
        f.from_ccr(0x0d);
        assert!(f.carry && f.zero && f.negative && !f.overflow);
        assert_eq!(f.to_ccr(), 0x0d);
    }
}
