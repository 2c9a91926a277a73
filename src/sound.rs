use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{VmError, VmResult};

pub const SOUND_MAGIC: u32 = 0x4d61_5364; // "MaSd"
pub const MAX_MUSIC_SIZE: usize = 0x4e20;

const RECORD_SIZE: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tune {
    tempo: u16,
    offset: u32,
    length: u32,
}

/// Named tunes from a `MaSd` file, in file order.
#[derive(Debug, Clone)]
pub struct SoundBank {
    file: Vec<u8>,
    index: IndexMap<String, Tune>,
}

impl SoundBank {
    pub fn parse(file: Vec<u8>) -> VmResult<SoundBank> {
        let header = file
            .get(..6)
            .ok_or_else(|| VmError::malformed("sound file", "truncated header"))?;
        if u32::from_be_bytes([header[0], header[1], header[2], header[3]]) != SOUND_MAGIC {
            return Err(VmError::malformed("sound file", "bad magic number"));
        }
        let size = u16::from_be_bytes([header[4], header[5]]) as usize;

        let mut index = IndexMap::new();
        for rec in (6..6 + size).step_by(RECORD_SIZE) {
            let raw = file
                .get(rec..rec + RECORD_SIZE)
                .ok_or_else(|| VmError::malformed("sound file", "index truncated"))?;
            let name: String = raw[..8]
                .iter()
                .take_while(|&&c| c != 0)
                .map(|&c| c as char)
                .collect();
            let tune = Tune {
                tempo: u16::from_be_bytes([raw[8], raw[9]]),
                offset: u32::from_be_bytes([raw[10], raw[11], raw[12], raw[13]]),
                length: u32::from_be_bytes([raw[14], raw[15], raw[16], raw[17]]),
            };
            index.insert(name, tune);
        }
        debug!("sound index with {} tunes", index.len());
        Ok(SoundBank { file, index })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(|s| s.as_str())
    }

    /// Note data and tempo for `name`.
    pub fn tune(&self, name: &str) -> VmResult<Option<(&[u8], u16)>> {
        let tune = match self.index.get(name) {
            Some(t) => *t,
            None => {
                warn!("no tune named '{}'", name);
                return Ok(None);
            }
        };
        if tune.length as usize > MAX_MUSIC_SIZE {
            return Err(VmError::Capacity("music buffer"));
        }
        let start = tune.offset as usize;
        let data = self
            .file
            .get(start..start + tune.length as usize)
            .ok_or_else(|| VmError::malformed("sound file", format!("tune '{}' truncated", name)))?;
        Ok(Some((data, tune.tempo)))
    }
}
