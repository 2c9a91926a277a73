//! The story's byte-addressable memory plus the read-only string and dictionary buffers.
//!
//! All access to the code image goes through a virtual pointer that is checked (or, for
//! early 64K games, wrapped) before it touches the buffer.

use log::warn;

use crate::error::{VmError, VmResult};
use crate::registers::Size;

/// Strings beyond this offset live in the overflow buffer.
pub const MAX_STRING_SIZE: usize = 0xff00;

#[derive(Debug, Clone)]
pub struct MemoryImage {
    code: Vec<u8>,
    mem_size: u32,
    wraps: bool,
    strings: Vec<u8>,
    strings_overflow: Vec<u8>,
    string_size: u32,
    strings2: Vec<u8>,
    dict: Option<Vec<u8>>,
    decode_table: Vec<u8>,
}

impl MemoryImage {
    /// Build an image from the story sections. `code` is padded to `mem_size`.
    pub fn new(
        version: u8,
        mut code: Vec<u8>,
        mem_size: u32,
        strings: Vec<u8>,
        strings2: Vec<u8>,
        dict: Option<Vec<u8>>,
        decode_offset: u32,
    ) -> VmResult<MemoryImage> {
        if code.len() > mem_size as usize {
            return Err(VmError::malformed("story file", "code larger than memory"));
        }
        code.resize(mem_size as usize, 0);

        let string_size = strings.len() as u32;
        let (strings, strings_overflow) = if strings.len() > MAX_STRING_SIZE {
            let mut low = strings;
            let high = low.split_off(MAX_STRING_SIZE);
            (low, high)
        } else {
            (strings, Vec::new())
        };

        let mut image = MemoryImage {
            code,
            mem_size,
            wraps: version < 4 && mem_size == 0x10000,
            strings,
            strings_overflow,
            string_size,
            strings2,
            dict,
            decode_table: Vec::new(),
        };
        image.decode_table = image.locate_decode_table(decode_offset)?;
        Ok(image)
    }

    fn locate_decode_table(&self, offset: u32) -> VmResult<Vec<u8>> {
        let offset = offset as usize;
        let (buf, start) = if offset >= self.string_size as usize {
            (&self.strings2, offset - self.string_size as usize)
        } else if offset >= MAX_STRING_SIZE {
            (&self.strings_overflow, offset - MAX_STRING_SIZE)
        } else {
            (&self.strings, offset)
        };
        if start > buf.len() {
            return Err(VmError::malformed("story file", "decode table outside strings"));
        }
        Ok(buf[start..].to_vec())
    }

    pub fn mem_size(&self) -> u32 {
        self.mem_size
    }

    pub fn string_size(&self) -> u32 {
        self.string_size
    }

    /// Translate a virtual pointer into a buffer index.
    #[inline]
    pub fn effective(&self, ptr: u32) -> VmResult<usize> {
        if self.wraps {
            return Ok((ptr & 0xffff) as usize);
        }
        if ptr >= self.mem_size {
            return Err(VmError::OutsideMemory(ptr));
        }
        Ok(ptr as usize)
    }

    pub fn read_u8(&self, ptr: u32) -> VmResult<u8> {
        Ok(self.code[self.effective(ptr)?])
    }

    pub fn write_u8(&mut self, ptr: u32, value: u8) -> VmResult<()> {
        let i = self.effective(ptr)?;
        self.code[i] = value;
        Ok(())
    }

    /// Big-endian read of `size` bytes.
    pub fn read(&self, ptr: u32, size: Size) -> VmResult<u32> {
        let mut value = 0u32;
        for i in 0..size.bytes() {
            value = (value << 8) | self.read_u8(ptr.wrapping_add(i))? as u32;
        }
        Ok(value)
    }

    /// Big-endian write of the low `size` bytes of `value`.
    pub fn write(&mut self, ptr: u32, size: Size, value: u32) -> VmResult<()> {
        let n = size.bytes();
        for i in 0..n {
            let shift = 8 * (n - 1 - i);
            self.write_u8(ptr.wrapping_add(i), (value >> shift) as u8)?;
        }
        Ok(())
    }

    pub fn read_u16(&self, ptr: u32) -> VmResult<u16> {
        Ok(self.read(ptr, Size::Word)? as u16)
    }

    pub fn write_u16(&mut self, ptr: u32, value: u16) -> VmResult<()> {
        self.write(ptr, Size::Word, value as u32)
    }

    pub fn read_u32(&self, ptr: u32) -> VmResult<u32> {
        self.read(ptr, Size::Long)
    }

    /// Copy `len` bytes starting at `ptr`, following the 64K wrap of early games.
    pub fn read_region(&self, ptr: u32, len: usize) -> VmResult<Vec<u8>> {
        (0..len as u32)
            .map(|i| self.read_u8(ptr.wrapping_add(i)))
            .collect()
    }

    /// Store `data` starting at `ptr`, following the 64K wrap of early games.
    pub fn write_region(&mut self, ptr: u32, data: &[u8]) -> VmResult<()> {
        for (i, &b) in data.iter().enumerate() {
            self.write_u8(ptr.wrapping_add(i as u32), b)?;
        }
        Ok(())
    }

    /// Borrow `len` contiguous bytes starting at `ptr`. The range may not cross the
    /// 64K wrap; `read_region` and `write_region` handle that case.
    pub fn slice(&self, ptr: u32, len: usize) -> VmResult<&[u8]> {
        let start = self.effective(ptr)?;
        self.code
            .get(start..start + len)
            .ok_or(VmError::OutsideMemory(ptr.wrapping_add(len as u32)))
    }

    pub fn slice_mut(&mut self, ptr: u32, len: usize) -> VmResult<&mut [u8]> {
        let start = self.effective(ptr)?;
        self.code
            .get_mut(start..start + len)
            .ok_or(VmError::OutsideMemory(ptr.wrapping_add(len as u32)))
    }

    /// Read a NUL-terminated string (at most `max` bytes) starting at `ptr`.
    pub fn c_string(&self, ptr: u32, max: usize) -> VmResult<String> {
        let mut s = String::new();
        for i in 0..max as u32 {
            let c = self.read_u8(ptr.wrapping_add(i))?;
            if c == 0 {
                break;
            }
            s.push(c as char);
        }
        Ok(s)
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Copy `src` over the start of the code image (restart and undo).
    pub fn restore_prefix(&mut self, src: &[u8]) {
        let n = src.len().min(self.code.len());
        if n < src.len() {
            warn!("snapshot larger than memory, truncating to {:#x} bytes", n);
        }
        self.code[..n].copy_from_slice(&src[..n]);
    }

    /// Byte `offset` of the concatenated string space (primary, overflow, then string2).
    pub fn string_byte(&self, offset: u32) -> u8 {
        let offset = offset as usize;
        if offset >= self.string_size as usize {
            self.strings2
                .get(offset - self.string_size as usize)
                .copied()
                .unwrap_or(0)
        } else if offset >= MAX_STRING_SIZE {
            self.strings_overflow[offset - MAX_STRING_SIZE]
        } else {
            self.strings[offset]
        }
    }

    pub fn decode_table(&self) -> &[u8] {
        &self.decode_table
    }

    pub fn decode_byte(&self, index: usize) -> u8 {
        self.decode_table.get(index).copied().unwrap_or(0x80)
    }

    pub fn decode_word(&self, index: usize) -> u16 {
        (self.decode_table.get(index).copied().unwrap_or(0) as u16) << 8
            | self.decode_table.get(index + 1).copied().unwrap_or(0) as u16
    }

    pub fn has_separate_dict(&self) -> bool {
        self.dict.is_some()
    }

    /// Dictionary byte; games without a separate dictionary keep it in code memory.
    pub fn dict_byte(&self, offset: u32) -> VmResult<u8> {
        match &self.dict {
            Some(d) => d
                .get((offset & 0xffff) as usize)
                .copied()
                .ok_or(VmError::OutsideMemory(offset)),
            None => self.read_u8(offset),
        }
    }

    pub fn set_dict_byte(&mut self, offset: u32, value: u8) -> VmResult<()> {
        match &mut self.dict {
            Some(d) => {
                let slot = d
                    .get_mut((offset & 0xffff) as usize)
                    .ok_or(VmError::OutsideMemory(offset))?;
                *slot = value;
                Ok(())
            }
            None => self.write_u8(offset, value),
        }
    }

    pub fn dict_word(&self, offset: u32) -> VmResult<u16> {
        Ok((self.dict_byte(offset)? as u16) << 8 | self.dict_byte(offset.wrapping_add(1))? as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn image(version: u8, mem_size: u32) -> MemoryImage {
        MemoryImage::new(version, vec![0; 16], mem_size, vec![1, 2, 3], vec![9, 8], None, 0).unwrap()
    }

    #[test]
    fn test_early_versions_wrap_at_64k() {
        let mut m = image(2, 0x10000);
        m.write_u16(0x1_0010, 0xbeef).unwrap();
        assert_eq!(m.read_u16(0x10).unwrap(), 0xbeef);
    }

    #[test]
    fn test_region_crosses_the_64k_wrap() {
        let mut m = image(2, 0x10000);
        m.write_region(0xfffe, &[1, 2, 3, 4]).unwrap();
        assert_eq!(m.code()[0xfffe..], [1, 2]);
        assert_eq!(m.code()[..2], [3, 4]);
        assert_eq!(m.read_region(0xfffe, 4).unwrap(), vec![1, 2, 3, 4]);

        let m = image(4, 0x10000);
        assert!(matches!(
            m.read_region(0xfffe, 4),
            Err(VmError::OutsideMemory(0x10000))
        ));
    }

    #[test]
    fn test_pointer_outside_memory_is_an_error() {
        let m = image(4, 0x100);
        assert!(matches!(m.read_u8(0x100), Err(VmError::OutsideMemory(0x100))));
        assert!(m.read_u8(0xff).is_ok());
    }

    #[test]
    fn test_big_endian_access() {
        let mut m = image(4, 0x100);
        m.write(0x10, Size::Long, 0x0102_0304).unwrap();
        assert_eq!(m.code()[0x10..0x14], [1, 2, 3, 4]);
        assert_eq!(m.read(0x11, Size::Word).unwrap(), 0x0203);
    }

    #[test]
    fn test_string_space_spans_all_buffers() {
        let mut strings = vec![0u8; MAX_STRING_SIZE + 2];
        strings[MAX_STRING_SIZE + 1] = 0x55;
        let m = MemoryImage::new(1, vec![], 0x10000, strings, vec![0x66], None, 0).unwrap();
        assert_eq!(m.string_byte(MAX_STRING_SIZE as u32 + 1), 0x55);
        assert_eq!(m.string_byte(MAX_STRING_SIZE as u32 + 2), 0x66);
    }

    #[test]
    fn test_decode_table_in_string2() {
        let m = MemoryImage::new(1, vec![], 0x10000, vec![0; 4], vec![7, 8, 9], None, 5).unwrap();
        assert_eq!(m.decode_table(), &[8, 9]);
    }
}
