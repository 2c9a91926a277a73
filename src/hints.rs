//! The `MaHt` hint tree: folders of topics and leaves of hint text.

use log::debug;

use crate::error::{VmError, VmResult};

pub const HINTS_MAGIC: u32 = 0x4d61_4874; // "MaHt"
pub const MAX_HINTS: usize = 260;
pub const MAX_HITEMS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Folder,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub node_type: NodeType,
    pub elements: Vec<String>,
    /// Child block per element, folders only
    pub links: Vec<u16>,
    pub parent: u16,
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> VmResult<&'a [u8]> {
        let bytes = self
            .buf
            .get(self.pos..self.pos + n)
            .ok_or_else(|| VmError::malformed("hints file", "truncated"))?;
        self.pos += n;
        Ok(bytes)
    }

    fn word(&mut self) -> VmResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }
}

/// Parse a complete hints file.
pub fn parse(file: &[u8]) -> VmResult<Vec<Hint>> {
    let magic = file
        .get(..4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| VmError::malformed("hints file", "truncated header"))?;
    if magic != HINTS_MAGIC {
        return Err(VmError::malformed("hints file", "bad magic number"));
    }

    let mut cur = Cursor { buf: file, pos: 4 };
    let blocks = cur.word()? as usize;
    if blocks > MAX_HINTS {
        return Err(VmError::Capacity("hint blocks"));
    }

    let mut hints = Vec::with_capacity(blocks);
    for _ in 0..blocks {
        let count = cur.word()? as usize;
        if count > MAX_HITEMS {
            return Err(VmError::Capacity("hint elements"));
        }
        let node_type = match cur.word()? {
            1 => NodeType::Folder,
            _ => NodeType::Text,
        };

        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            let size = cur.word()? as usize;
            let raw = cur.take(size)?;
            // last byte is the terminator
            let text = &raw[..size.saturating_sub(1)];
            elements.push(String::from_utf8_lossy(text).into_owned());
        }

        let mut links = Vec::new();
        if node_type == NodeType::Folder {
            for _ in 0..count {
                links.push(cur.word()?);
            }
        }
        let parent = cur.word()?;
        hints.push(Hint {
            node_type,
            elements,
            links,
            parent,
        });
    }
    debug!("loaded {} hint blocks", hints.len());
    Ok(hints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn push_word(v: &mut Vec<u8>, w: u16) {
        v.extend_from_slice(&w.to_le_bytes());
    }

    fn push_text(v: &mut Vec<u8>, s: &str) {
        push_word(v, s.len() as u16 + 1);
        v.extend_from_slice(s.as_bytes());
        v.push(0);
    }

    #[test]
    fn test_folder_and_text_blocks() {
        let mut f = b"MaHt".to_vec();
        push_word(&mut f, 2);
        // folder with one topic linking to block 1
        push_word(&mut f, 1);
        push_word(&mut f, 1);
        push_text(&mut f, "The mill");
        push_word(&mut f, 1);
        push_word(&mut f, 0xffff);
        // text block with two hints
        push_word(&mut f, 2);
        push_word(&mut f, 2);
        push_text(&mut f, "Look closer.");
        push_text(&mut f, "Pull the lever.");
        push_word(&mut f, 0);

        let hints = parse(&f).unwrap();
        assert_eq!(hints.len(), 2);
        assert_eq!(hints[0].node_type, NodeType::Folder);
        assert_eq!(hints[0].elements, vec!["The mill"]);
        assert_eq!(hints[0].links, vec![1]);
        assert_eq!(hints[1].node_type, NodeType::Text);
        assert_eq!(hints[1].elements[1], "Pull the lever.");
        assert!(hints[1].links.is_empty());
        assert_eq!(hints[1].parent, 0);
    }

    #[test]
    fn test_truncated_hints_are_malformed() {
        let mut f = b"MaHt".to_vec();
        push_word(&mut f, 1);
        push_word(&mut f, 1);
        assert!(matches!(parse(&f), Err(VmError::Malformed { .. })));
    }

    #[test]
    fn test_too_many_blocks() {
        let mut f = b"MaHt".to_vec();
        push_word(&mut f, MAX_HINTS as u16 + 1);
        assert!(matches!(parse(&f), Err(VmError::Capacity(_))));
    }
}
