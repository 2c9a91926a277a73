//! Dictionary lookup and the dictionary byte operations behind extensions E9-EC.
//!
//! The dictionary is a run of entries, each spelled in plain bytes with the last letter
//! flagged by bit 7. `0x82` starts the next bank of words and `0x81` ends the table.
//! Games with a separate dictionary keep it out of code memory; older games embed it.

use log::debug;

use crate::error::{VmError, VmResult};
use crate::host::Host;
use crate::registers::Size;
use crate::vm::Vm;

const A0: usize = 8;
const A1: usize = 9;
const A2: usize = 10;
const A3: usize = 11;
const A5: usize = 13;
const A6: usize = 14;

const END_OF_TABLE: u8 = 0x81;
const NEXT_BANK: u8 = 0x82;
const SYNONYM_BANK: u8 = 0x0b;
const NOUN_BANK: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DictMatch {
    flag: u8,
    bank: u8,
    word: u16,
    len: u8,
}

impl Vm {
    /// Skip past the high-bit byte that ends the current entry.
    fn skip_entry(&self, mut doff: u32) -> VmResult<u32> {
        loop {
            let b = self.mem.dict_byte(doff)?;
            doff += 1;
            if b >= 0x80 {
                return Ok(doff);
            }
        }
    }

    /// Match the word at A6 against every dictionary entry.
    ///
    /// On entry A3 is the dictionary, A2 the output table, D6.B the first bank number,
    /// A5 the synonym table, A0 the per-noun adjective lists and A1 (if nonzero) the
    /// adjectives already typed. Each surviving match is stored at A2 as
    /// `[flag, bank, word.w]` and the table ends with `0xffff`. Only the longest matches
    /// are kept. On exit A5 is just past the matched text, D1.B is its length, A2 points
    /// at the terminator and Z is set when nothing matched. D0.W is `0x200 + c` when the
    /// word was followed by an apostrophe and `c`.
    pub(crate) fn dict_lookup(&mut self) -> VmResult<()> {
        let version = self.version();
        let dtab = self.regs.read(A5, Size::Word);
        let start = self.regs.read(A6, Size::Word);
        let mut doff = self.regs.read(A3, Size::Word);
        let mut bank = self.regs.read(6, Size::Byte) as u8;
        self.regs.write(A5, Size::Word, start);
        self.regs.write(0, Size::Word, 0);

        let mut input = start;
        let mut flag = 0u8;
        let mut matchlen = 0u8;
        let mut word = 0u16;
        let mut found = Vec::new();

        loop {
            if doff > 0xffff {
                return Err(VmError::malformed("dictionary", "missing end marker"));
            }
            let c = self.mem.dict_byte(doff)?;
            if c == END_OF_TABLE {
                break;
            }
            if c == NEXT_BANK {
                flag = 0;
                matchlen = 0;
                word = 0;
                input = start;
                bank = bank.wrapping_add(1);
                doff += 1;
                continue;
            }

            let c2 = self.mem.read_u8(input)? & 0x5f;
            let truncated = version == 0 && matchlen > 6 && c2 == 0;
            let mut accept = false;
            if c >= 0x80 {
                if c2 == c & 0x5f {
                    input += 1;
                    matchlen = matchlen.wrapping_add(1);
                    let c3 = self.mem.read_u8(input)?;
                    if c3 == 0 || c3 == b' ' || c3 == b'\'' || (version == 0 && matchlen > 6) {
                        if c3 == b'\'' {
                            input += 1;
                            let next = self.mem.read_u8(input)?;
                            self.regs.write(0, Size::Word, 0x200 + next as u32);
                        }
                        accept = true;
                    }
                } else {
                    accept = truncated;
                }
            } else {
                let c = c & 0x5f;
                let wildcard = version != 0 && c2 == 0 && c == 0x5f;
                if (c2 == c && c != 0) || wildcard {
                    if wildcard {
                        flag = 0x80;
                    }
                    matchlen = matchlen.wrapping_add(1);
                    input += 1;
                    doff += 1;
                    continue;
                }
                accept = truncated;
            }

            if accept {
                found.push(DictMatch {
                    flag: if version != 0 { flag } else { 0 },
                    bank,
                    word,
                    len: matchlen,
                });
            }
            input = start;
            flag = 0;
            matchlen = 0;
            word = word.wrapping_add(1);
            doff = self.skip_entry(doff)?;
        }

        if version > 0 {
            for m in found.iter_mut().filter(|m| m.bank == SYNONYM_BANK) {
                let tmp = self.mem.dict_word(dtab + m.word as u32 * 2)?;
                m.bank = (tmp & 0x1f) as u8;
                m.word = tmp >> 5;
            }
        }

        let given = self.regs.read(A1, Size::Word);
        if given != 0 {
            let adjectives = self.zero_terminated(given)?;
            let lists = self.regs.read(A0, Size::Word);
            let mut kept = Vec::with_capacity(found.len());
            for m in found {
                if m.bank != NOUN_BANK || self.noun_takes(lists, m.word, &adjectives)? {
                    kept.push(m);
                }
            }
            found = kept;
        }

        let longest = found.iter().map(|m| m.len).max().unwrap_or(0);
        found.retain(|m| m.len == longest);
        debug!("dictionary: {} match(es) of length {}", found.len(), longest);

        let mut output = self.regs.read(A2, Size::Word);
        for m in &found {
            self.mem.write_u8(output, m.flag)?;
            self.mem.write_u8(output + 1, m.bank)?;
            self.mem.write_u16(output + 2, m.word)?;
            output += 4;
        }
        self.mem.write_u16(output, 0xffff)?;

        self.regs.write(A2, Size::Word, output);
        self.regs.write(A5, Size::Word, start + longest as u32);
        self.regs.write(1, Size::Byte, longest as u32);
        self.regs.flags.zero = found.is_empty();
        Ok(())
    }

    fn zero_terminated(&self, mut ptr: u32) -> VmResult<Vec<u8>> {
        let mut bytes = Vec::new();
        loop {
            let b = self.mem.read_u8(ptr)?;
            if b == 0 || bytes.len() > 0xff {
                return Ok(bytes);
            }
            bytes.push(b);
            ptr += 1;
        }
    }

    /// Noun `word` owns the `word`th zero-terminated list at `lists`. Entries are stored
    /// three above the adjective number.
    fn noun_takes(&self, lists: u32, word: u16, adjectives: &[u8]) -> VmResult<bool> {
        let mut ptr = lists;
        for _ in 0..word {
            while self.mem.read_u8(ptr)? != 0 {
                ptr += 1;
            }
            ptr += 1;
        }
        let own = self.zero_terminated(ptr)?;
        Ok(adjectives
            .iter()
            .all(|&a| own.iter().any(|&c| c.wrapping_sub(3) == a)))
    }

    /// Copy the dictionary entry at A1 to memory at A0, end byte included. Both
    /// registers are left just past the entry.
    pub(crate) fn copy_dict_word(&mut self) -> VmResult<()> {
        let mut src = self.regs.read(A1, Size::Word);
        let mut dst = self.regs.read(A0, Size::Word);
        loop {
            let b = self.mem.dict_byte(src)?;
            self.mem.write_u8(dst, b)?;
            src += 1;
            dst += 1;
            if b >= 0x80 {
                break;
            }
        }
        self.regs.write(A1, Size::Word, src);
        self.regs.write(A0, Size::Word, dst);
        Ok(())
    }

    /// Print the dictionary entry at A1 on the channel selected by D1.B.
    pub(crate) fn print_dict_word(&mut self, host: &mut dyn Host) -> VmResult<()> {
        let saved = self.regs.read(3, Size::Byte);
        let channel = self.regs.read(1, Size::Byte);
        self.regs.write(3, Size::Byte, channel);
        let mut ptr = self.regs.read(A1, Size::Word);
        let result = loop {
            let b = match self.mem.dict_byte(ptr) {
                Ok(b) => b,
                Err(e) => break Err(e),
            };
            self.char_out(b & 0x7f, host);
            ptr += 1;
            if b >= 0x80 {
                break Ok(());
            }
        };
        self.regs.write(A1, Size::Word, ptr);
        self.regs.write(3, Size::Byte, saved);
        result
    }

    pub(crate) fn store_dict_byte(&mut self) -> VmResult<()> {
        let ptr = self.regs.read(A1, Size::Long);
        let value = self.regs.read(1, Size::Byte) as u8;
        self.mem.set_dict_byte(ptr, value)
    }

    pub(crate) fn load_dict_byte(&mut self) -> VmResult<()> {
        let ptr = self.regs.read(A1, Size::Long);
        let value = self.mem.dict_byte(ptr)?;
        self.regs.write(1, Size::Byte, value as u32);
        Ok(())
    }
}
