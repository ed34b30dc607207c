//! Grouping rendered fragments into pages for paged playback.

use crate::application::narration::Fragment;

/// One page of output plus the files its references touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub text: String,
    pub files: Vec<String>,
    /// Set once non-whitespace prose landed in this block.
    has_prose: bool,
}

impl Block {
    fn push(&mut self, fragment: &Fragment) {
        self.text.push_str(&fragment.text);
        if fragment.is_substantive_prose() {
            self.has_prose = true;
        }
        if let Some(path) = fragment.path_hint()
            && !path.is_empty()
            && !self.files.iter().any(|f| f == path)
        {
            self.files.push(path.to_string());
        }
    }
}

/// Append-only list of blocks, built strictly in fragment order.
///
/// A reference opens a new block once the current block already carries
/// substantive prose; runs of references and whitespace-only text never
/// split.
#[derive(Debug, Clone, Default)]
pub struct BlockList {
    blocks: Vec<Block>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, fragment: &Fragment) {
        let starts_block = match self.blocks.last() {
            None => true,
            Some(current) => fragment.token.is_reference() && current.has_prose,
        };
        if starts_block {
            self.blocks.push(Block::default());
        }
        if let Some(current) = self.blocks.last_mut() {
            current.push(fragment);
        }
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
