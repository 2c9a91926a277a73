//! Picture file decoding.
//!
//! Two unrelated formats exist. Classic games ship a `MaPi` file: a directory of offsets
//! into blocks compressed with a binary tree and run lengths, rows XORed against the row
//! above. Later games ship `MaP2`: a named directory of blocks holding four bit planes,
//! optionally followed by animation data (see `animation`).

use bitreader::BitReader;
use bitvec::prelude::*;
use log::{debug, warn};

use crate::error::{VmError, VmResult};

pub const CLASSIC_MAGIC: u32 = 0x4d61_5069; // "MaPi"
pub const WINDOWS_MAGIC: u32 = 0x4d61_5032; // "MaP2"

/// Largest decoded bitmap, in pixels.
pub const MAX_PICTURE_SIZE: usize = 0xc800;

/// Offset of the pixel planes inside a `MaP2` block.
const PLANES_OFFSET: usize = 48;

pub(crate) fn be16(buf: &[u8], at: usize) -> VmResult<u16> {
    buf.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| VmError::malformed("picture", format!("read past end at {:#x}", at)))
}

pub(crate) fn be32(buf: &[u8], at: usize) -> VmResult<u32> {
    buf.get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| VmError::malformed("picture", format!("read past end at {:#x}", at)))
}

pub(crate) fn le16(buf: &[u8], at: usize) -> VmResult<u16> {
    buf.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| VmError::malformed("picture", format!("read past end at {:#x}", at)))
}

pub(crate) fn le32(buf: &[u8], at: usize) -> VmResult<u32> {
    buf.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| VmError::malformed("picture", format!("read past end at {:#x}", at)))
}

/// One bit per pixel, rows padded to whole 16-bit words. A set bit is transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    bits: BitVec<u8, Msb0>,
    row_bits: usize,
}

impl Mask {
    /// Bytes per mask row for a frame `width` pixels wide.
    pub fn row_bytes(width: u16) -> usize {
        ((((width as usize).saturating_sub(1)) / 8) + 2) & !1
    }

    pub fn from_bytes(bytes: &[u8], width: u16, height: u16) -> VmResult<Mask> {
        let row = Mask::row_bytes(width);
        let len = row * height as usize;
        let raw = bytes
            .get(..len)
            .ok_or_else(|| VmError::malformed("picture", "animation mask truncated"))?;
        Ok(Mask {
            bits: BitVec::from_slice(raw),
            row_bits: row * 8,
        })
    }

    pub fn is_transparent(&self, x: usize, y: usize) -> bool {
        self.bits
            .get(y * self.row_bits + x)
            .map(|b| *b)
            .unwrap_or(false)
    }
}

/// A decoded bitmap, one palette index per byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub width: u16,
    pub height: u16,
    /// 0x0RGB entries
    pub palette: [u16; 16],
    pub pixels: Vec<u8>,
    pub mask: Option<Mask>,
}

impl Picture {
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width as usize + x]
    }

    /// Draw `frame` with its top left corner at (x, y), clipped to this picture and
    /// honouring the frame's transparency mask.
    pub fn blit(&mut self, frame: &Picture, x: i32, y: i32) {
        let (w, h) = (self.width as i32, self.height as i32);
        for fy in 0..frame.height as i32 {
            let ty = y + fy;
            if ty < 0 || ty >= h {
                continue;
            }
            for fx in 0..frame.width as i32 {
                let tx = x + fx;
                if tx < 0 || tx >= w {
                    continue;
                }
                if let Some(mask) = &frame.mask {
                    if mask.is_transparent(fx as usize, fy as usize) {
                        continue;
                    }
                }
                self.pixels[(ty * w + tx) as usize] = frame.pixel(fx as usize, fy as usize);
            }
        }
    }
}

/// De-interleave four bit planes into one palette index per pixel. Each row is
/// `data_size / height` bytes, a quarter of it per plane.
pub fn extract_frame(data: &[u8], data_size: usize, width: u16, height: u16) -> VmResult<Vec<u8>> {
    let (width, height) = (width as usize, height as usize);
    if width * height > MAX_PICTURE_SIZE {
        return Err(VmError::Capacity("picture buffer"));
    }
    if height == 0 {
        return Ok(Vec::new());
    }
    let wbytes = data_size / height;
    let plane_step = wbytes / 4;

    let mut pixels = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let bit_x = 7 - (x & 7);
            let base = y * wbytes + x / 8;
            let mut value = 0u8;
            for plane in 0..4 {
                let byte = *data
                    .get(base + plane * plane_step)
                    .ok_or_else(|| VmError::malformed("picture", "bit planes truncated"))?;
                value |= ((byte >> bit_x) & 1) << plane;
            }
            pixels[y * width + x] = value & 0x0f;
        }
    }
    Ok(pixels)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub offset: u32,
    pub length: u32,
}

#[derive(Debug, Clone)]
pub enum Graphics {
    /// `MaPi`: body after the 8-byte file header
    Classic { data: Vec<u8> },
    /// `MaP2`: name directory plus the whole file
    Windows {
        directory: Vec<DirectoryEntry>,
        file: Vec<u8>,
    },
}

impl Graphics {
    pub fn parse(file: Vec<u8>) -> VmResult<Graphics> {
        match be32(&file, 0)? {
            CLASSIC_MAGIC => {
                if file.len() < 8 {
                    return Err(VmError::malformed("picture file", "truncated header"));
                }
                Ok(Graphics::Classic {
                    data: file[8..].to_vec(),
                })
            }
            WINDOWS_MAGIC => {
                let size = be16(&file, 4)? as usize;
                let mut directory = Vec::with_capacity(size / 16);
                for rec in (6..6 + size).step_by(16) {
                    let raw = file
                        .get(rec..rec + 16)
                        .ok_or_else(|| VmError::malformed("picture file", "directory truncated"))?;
                    let name: String = raw[..8]
                        .iter()
                        .take_while(|&&c| c != 0)
                        .map(|&c| c as char)
                        .collect();
                    directory.push(DirectoryEntry {
                        name,
                        offset: be32(raw, 8)?,
                        length: be32(raw, 12)?,
                    });
                }
                debug!("picture directory with {} entries", directory.len());
                Ok(Graphics::Windows { directory, file })
            }
            _ => Err(VmError::malformed("picture file", "bad magic number")),
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Graphics::Windows { .. })
    }

    /// Decode classic picture number `pic`. `None` when the directory slot is empty.
    pub fn extract1(&self, pic: u32) -> VmResult<Option<Picture>> {
        let data = match self {
            Graphics::Classic { data } => data,
            Graphics::Windows { .. } => return Ok(None),
        };
        let offset = be32(data, 4 * pic as usize)? as usize;
        if offset < 8 {
            return Ok(None);
        }
        let block = data
            .get(offset - 8..)
            .ok_or_else(|| VmError::malformed("picture", "block offset past end of file"))?;

        let mut palette = [0u16; 16];
        for (i, entry) in palette.iter_mut().enumerate() {
            *entry = be16(block, 0x1c + 2 * i)?;
        }
        let width = be16(block, 4)?.wrapping_sub(be16(block, 2)?);
        let height = be16(block, 6)?;
        let size = width as usize * height as usize;
        if size > MAX_PICTURE_SIZE {
            return Err(VmError::Capacity("picture buffer"));
        }

        let table_size = be16(block, 0x3c)? as usize;
        let table = block
            .get(0x42..)
            .ok_or_else(|| VmError::malformed("picture", "tree table truncated"))?;
        let stream = table
            .get(table_size * 2 + 2..)
            .ok_or_else(|| VmError::malformed("picture", "pixel stream truncated"))?;

        let mut pixels = decode_runs(table, table_size, stream, size)?;
        let w = width as usize;
        for i in w..pixels.len() {
            pixels[i] ^= pixels[i - w];
        }

        let (top, rows) = trim_blank_rows(&pixels, w, height as usize);
        debug!(
            "picture {}: {}x{} ({} blank rows trimmed)",
            pic,
            width,
            rows,
            height as usize - rows
        );
        Ok(Some(Picture {
            width,
            height: rows as u16,
            palette,
            pixels: pixels[top * w..(top + rows) * w].to_vec(),
            mask: None,
        }))
    }

    /// Locate a named `MaP2` block (six characters, case-insensitive).
    pub fn find(&self, name: &str) -> Option<&[u8]> {
        let (directory, file) = match self {
            Graphics::Windows { directory, file } => (directory, file),
            Graphics::Classic { .. } => return None,
        };
        let key: String = name.chars().take(6).collect();
        let entry = directory.iter().find(|e| {
            let n: String = e.name.chars().take(6).collect();
            n.eq_ignore_ascii_case(&key)
        })?;
        let start = entry.offset as usize;
        let block = file.get(start..start + entry.length as usize);
        if block.is_none() {
            warn!("picture '{}' extends past end of file", entry.name);
        }
        block
    }

    /// Decode the base image of a named `MaP2` picture. Returns the picture and the offset
    /// of its trailing animation data within the block.
    pub fn extract2(&self, name: &str) -> VmResult<Option<(Picture, &[u8], usize)>> {
        let block = match self.find(name) {
            Some(b) => b,
            None => return Ok(None),
        };
        let mut palette = [0u16; 16];
        for (i, entry) in palette.iter_mut().enumerate() {
            *entry = le16(block, 4 + 2 * i)?;
        }
        let data_size = le32(block, 38)? as usize;
        let width = le16(block, 42)?;
        let height = le16(block, 44)?;
        let planes = block
            .get(PLANES_OFFSET..)
            .ok_or_else(|| VmError::malformed("picture", "bit planes truncated"))?;
        let pixels = extract_frame(planes, data_size, width, height)?;
        Ok(Some((
            Picture {
                width,
                height,
                palette,
                pixels,
                mask: None,
            },
            block,
            PLANES_OFFSET + data_size,
        )))
    }
}

/// Walk the tree for each run: from node `table_size`, a one bit follows the first child
/// byte and a zero bit the second, until a leaf (high bit set) is reached. Leaves below
/// 0x10 are literal colours; larger ones repeat the last colour `leaf - 0x0f` times.
fn decode_runs(table: &[u8], table_size: usize, stream: &[u8], size: usize) -> VmResult<Vec<u8>> {
    let mut reader = BitReader::new(stream);
    let mut pixels = Vec::with_capacity(size);
    let mut value = 0u8;
    while pixels.len() < size {
        let mut node = table_size;
        while node < 0x80 {
            let index = if reader.read_bool()? { 2 * node } else { 2 * node + 1 };
            node = *table
                .get(index)
                .ok_or_else(|| VmError::malformed("picture", "tree index out of range"))?
                as usize;
        }
        let leaf = (node & 0x7f) as u8;
        let run = if leaf >= 0x10 {
            (leaf - 0x0f) as usize
        } else {
            value = leaf;
            1
        };
        let run = run.min(size - pixels.len());
        pixels.extend(std::iter::repeat(value).take(run));
    }
    Ok(pixels)
}

/// Returns (first kept row, kept row count) after dropping all-zero rows at both ends.
fn trim_blank_rows(pixels: &[u8], width: usize, height: usize) -> (usize, usize) {
    if width == 0 {
        return (0, height);
    }
    let blank = |row: usize| pixels[row * width..(row + 1) * width].iter().all(|&p| p == 0);
    let mut end = height;
    while end > 0 && blank(end - 1) {
        end -= 1;
    }
    let mut start = 0;
    while start < end && blank(start) {
        start += 1;
    }
    (start, end - start)
}
