//! Game text: the compressed string decoder and the output filter in front of the host.
//!
//! Strings are bit streams read least significant bit first. Each bit walks a binary
//! tree held in the first 256 bytes of the decode table (left children at `c`, right
//! children at `0x80 + c`) until a value with the top bit set is reached.

use log::trace;

use crate::error::VmResult;
use crate::host::Host;
use crate::registers::Size;
use crate::vm::Vm;

/// Capitalisation and spacing state carried between characters.
#[derive(Debug, Default, Clone)]
pub struct CharOut {
    /// Capitalise the next letter
    pub big: bool,
    /// Insert a space before the next letter
    pub period: bool,
    /// Swallow the character after a `|` (early formats)
    pub pipe: bool,
    pub lastchar: u8,
}

/// Where a paused string resumes.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringCursor {
    pub offset: u32,
    pub mask: u8,
    pub last_decoded: u8,
}

const PAUSE: u8 = 0x40;

fn is_letter(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

impl Vm {
    /// Send one character of game text through the output filter.
    pub(crate) fn char_out(&mut self, c: u8, host: &mut dyn Host) {
        if c == 0xff {
            self.out.big = true;
            return;
        }
        let mut c = c & 0x7f;
        let version = self.version();

        if self.regs.read(3, Size::Byte) != 0 {
            if c == 0x5f || c == 0x40 {
                c = b' ';
            }
            c = c.to_ascii_uppercase();
            if version < 4 {
                host.show_status_char(c);
            }
            return;
        }

        if c == 0x5e {
            c = b'\n';
        }
        if c == 0x40 {
            if self.regs.read(2, Size::Byte) != 0 {
                return;
            }
            c = b's';
        }
        if version < 3 && c == 0x7e {
            self.out.lastchar = 0x7e;
            c = b'\n';
        }

        if is_letter(c) {
            if self.out.big {
                c = c.to_ascii_uppercase();
                self.out.big = false;
            }
            // the space after punctuation goes through the filter like any other
            if self.out.period {
                self.char_out(b' ', host);
            }
        }
        let out = &mut self.out;
        out.period = false;

        if version >= 4 && c == b' ' && out.lastchar == b'\n' {
            return;
        }
        match c {
            b'.' | b'?' | b'!' | b'\n' => out.big = true,
            b'"' => out.big = false,
            _ => {}
        }
        if (c == b' ' || c == b'\n') && c == out.lastchar {
            return;
        }

        if version < 3 {
            if out.pipe {
                out.pipe = false;
                return;
            }
            if c == 0x7c {
                out.pipe = true;
                return;
            }
        } else if c == 0x7e {
            c = b'\n';
            if out.lastchar != b'\n' {
                host.write_char(b'\n');
            }
        }

        out.lastchar = c;
        if c == 0x5f {
            c = b' ';
        }
        if matches!(c, b'.' | b',' | b';' | b':' | b'!' | b'?') {
            out.period = true;
        }
        host.write_char(c);
    }

    /// Decode and print the string numbered D0.W. With carry set on entry, continue a
    /// string that paused on `@@`. Carry is set on exit when the string paused again.
    pub(crate) fn write_string(&mut self, host: &mut dyn Host) -> VmResult<()> {
        if !self.regs.flags.carry {
            let ptr = self.regs.read(0, Size::Word);
            let mut offset = if ptr == 0 {
                0
            } else {
                self.mem.decode_word(0x100 + 2 * ptr as usize) as u32
            };
            let split = self.mem.decode_word(0x100) as u32;
            if split != 0 && ptr >= split {
                offset += self.mem.string_size();
            }
            trace!("string {} at offset {:#x}", ptr, offset);
            self.string = StringCursor {
                offset,
                mask: 1,
                last_decoded: 0,
            };
        }

        let mut cursor = self.string;
        let c = loop {
            let mut c = 0u8;
            while c < 0x80 {
                let bits = self.mem.string_byte(cursor.offset);
                c = if bits & cursor.mask != 0 {
                    self.mem.decode_byte(0x80 + c as usize)
                } else {
                    self.mem.decode_byte(c as usize)
                };
                cursor.mask <<= 1;
                if cursor.mask == 0 {
                    cursor.mask = 1;
                    cursor.offset += 1;
                }
            }
            let c = c & 0x7f;
            if c == 0 || (c == PAUSE && cursor.last_decoded == PAUSE) {
                break c;
            }
            cursor.last_decoded = c;
            self.char_out(c, host);
        };

        self.regs.flags.carry = c != 0;
        if c != 0 {
            cursor.last_decoded = 0;
            self.string = cursor;
        }
        Ok(())
    }
}
