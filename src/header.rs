use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use sub_array::SubArray;

use crate::error::{VmError, VmResult};

pub const HEADER_SIZE: usize = 42;
pub const STORY_MAGIC: u32 = 0x4d61_5363; // "MaSc"

/// The fixed 42-byte story file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub code_size: u32,
    pub string_size: u32,
    pub string2_size: u32,
    pub dict_size: u32,
    pub decode_offset: u32,
    pub undo_size: u32,
    pub undo_pc: u32,
}

fn be32(bytes: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*bytes)
}

impl Header {
    pub fn new(bytes: &[u8]) -> VmResult<Header> {
        let raw: [u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| VmError::malformed("story header", "file shorter than 42 bytes"))?;

        if be32(raw.sub_array_ref(0)) != STORY_MAGIC {
            return Err(VmError::malformed("story header", "bad magic number"));
        }
        if be32(raw.sub_array_ref(8)) != HEADER_SIZE as u32 {
            return Err(VmError::malformed("story header", "unexpected header length"));
        }

        Ok(Header {
            version: raw[13],
            code_size: be32(raw.sub_array_ref(14)),
            string_size: be32(raw.sub_array_ref(18)),
            string2_size: be32(raw.sub_array_ref(22)),
            dict_size: be32(raw.sub_array_ref(26)),
            decode_offset: be32(raw.sub_array_ref(30)),
            undo_size: be32(raw.sub_array_ref(34)),
            undo_pc: be32(raw.sub_array_ref(38)),
        })
    }

    /// Size of the addressable code image. Early games always get a full 64K segment.
    pub fn mem_size(&self) -> u32 {
        if self.version < 4 && self.code_size < 0x10000 {
            0x10000
        } else {
            self.code_size
        }
    }

    pub fn has_separate_dict(&self) -> bool {
        self.dict_size != 0
    }

    /// Number of bytes a well-formed story file must contain.
    pub fn file_len(&self) -> usize {
        HEADER_SIZE
            + self.code_size as usize
            + self.string_size as usize
            + self.string2_size as usize
            + self.dict_size as usize
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "
Story version:            {}
Code size:                {:#07x}
String size:              {:#07x}
String2 size:             {:#07x}
Dictionary size:          {:#07x}
Decode table offset:      {:#07x}
Undo size:                {:#07x}
Undo PC:                  {:#07x}
",
            self.version,
            self.code_size,
            self.string_size,
            self.string2_size,
            self.dict_size,
            self.decode_offset,
            self.undo_size,
            self.undo_pc,
        )
    }
}
