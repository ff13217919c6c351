//! Block-based patching of generated-but-editable source files.
//!
//! A file is split into blocks. Top-level `import`, `const`, `export const`
//! and `export function` lines start a new block whose key is the declared
//! name; everything else belongs to the block above it. Edits address blocks
//! by key and lines by prefix, so lines a developer added by hand survive
//! every regeneration. Printing a parsed file gives back its exact text,
//! line endings included.

use crate::codegen::fs_utils;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("no block {0}")]
    BlockNotFound(BlockKey),

    #[error("block {key} has no line starting with '{prefix}'")]
    PrefixNotFound { key: BlockKey, prefix: String },

    #[error("block {0} already exists")]
    DuplicateBlock(BlockKey),

    #[error("cannot insert a block at position {position} of {len}")]
    Position { position: usize, len: usize },

    #[error("invalid block pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// What kind of declaration opened a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Import,
    Const,
    ExportConst,
    ExportFunction,
}

impl BlockKind {
    fn pattern(&self) -> &'static str {
        match self {
            BlockKind::Import => r"^import\s+(.+?)\s+from\b",
            BlockKind::Const => r"^const\s+([A-Za-z_$][\w$]*)\s*=",
            BlockKind::ExportConst => r"^export\s+const\s+([A-Za-z_$][\w$]*)\s*=",
            BlockKind::ExportFunction => r"^export\s+function\s+([A-Za-z_$][\w$]*)\s*\(",
        }
    }
}

/// Identity of a keyed block
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockKey {
    pub kind: BlockKind,
    pub name: String,
}

impl BlockKey {
    pub fn new(kind: BlockKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn import(name: impl Into<String>) -> Self {
        Self::new(BlockKind::Import, name)
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self::new(BlockKind::Const, name)
    }

    pub fn export_const(name: impl Into<String>) -> Self {
        Self::new(BlockKind::ExportConst, name)
    }

    pub fn export_function(name: impl Into<String>) -> Self {
        Self::new(BlockKind::ExportFunction, name)
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            BlockKind::Import => "import",
            BlockKind::Const => "const",
            BlockKind::ExportConst => "export const",
            BlockKind::ExportFunction => "export function",
        };
        write!(f, "'{} {}'", kind, self.name)
    }
}

/// Recognizes the lines that open a keyed block
struct BlockMatcher {
    patterns: Vec<(BlockKind, Regex)>,
}

impl BlockMatcher {
    fn new() -> Result<Self, regex::Error> {
        let patterns = [
            BlockKind::Import,
            BlockKind::ExportConst,
            BlockKind::ExportFunction,
            BlockKind::Const,
        ]
        .into_iter()
        .map(|kind| Ok((kind, Regex::new(kind.pattern())?)))
        .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { patterns })
    }

    fn key(&self, raw: &str) -> Option<BlockKey> {
        self.patterns.iter().find_map(|(kind, regex)| {
            let captured = regex.captures(raw)?.get(1)?.as_str();
            let name = match kind {
                BlockKind::Import => captured
                    .trim_start_matches('{')
                    .trim_end_matches('}')
                    .trim()
                    .to_string(),
                _ => captured.to_string(),
            };
            Some(BlockKey::new(*kind, name))
        })
    }
}

/// How a line was terminated in the parsed text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Added by a patch: uses the file's own newline
    #[default]
    Native,
    Lf,
    CrLf,
    /// Last line of a file without a trailing newline
    Missing,
}

impl LineEnding {
    /// Split `raw` (one chunk of `split_inclusive('\n')`) from its terminator
    fn split(raw: &str) -> (&str, LineEnding) {
        if let Some(line) = raw.strip_suffix("\r\n") {
            (line, LineEnding::CrLf)
        } else if let Some(line) = raw.strip_suffix('\n') {
            (line, LineEnding::Lf)
        } else {
            (raw, LineEnding::Missing)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    /// Line text without its terminator
    pub raw: String,
    pub is_code: bool,
    pub ending: LineEnding,
}

impl CodeLine {
    fn new(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        let is_code = !(trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with("/*"));
        Self {
            raw: raw.to_string(),
            is_code,
            ending: LineEnding::Native,
        }
    }

    fn comment(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            is_code: false,
            ending: LineEnding::Native,
        }
    }

    fn with_ending(mut self, ending: LineEnding) -> Self {
        self.ending = ending;
        self
    }

    pub fn trimmed(&self) -> &str {
        self.raw.trim_start()
    }

    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub key: Option<BlockKey>,
    pub lines: Vec<CodeLine>,
}

impl CodeBlock {
    pub fn new(key: Option<BlockKey>, lines: &[&str]) -> Self {
        Self {
            key,
            lines: lines.iter().map(|line| CodeLine::new(line)).collect(),
        }
    }

    pub fn keyed(key: BlockKey, lines: &[&str]) -> Self {
        Self::new(Some(key), lines)
    }

    fn position(&self, prefix: &str) -> Option<usize> {
        self.lines.iter().position(|line| line.trimmed().starts_with(prefix))
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.position(prefix).is_some()
    }
}

#[derive(Clone, Copy)]
enum ParseState {
    Code,
    Comment,
}

/// A source file decomposed into addressable blocks
#[derive(Debug, Clone, Default)]
pub struct CodeFile {
    blocks: Vec<CodeBlock>,
    index: HashMap<BlockKey, usize>,
    /// The parsed text used CRLF line endings
    crlf: bool,
}

impl CodeFile {
    pub fn parse(text: &str) -> Result<Self, PatchError> {
        let matcher = BlockMatcher::new()?;
        let mut blocks = vec![CodeBlock::new(None, &[])];
        let mut seen: HashSet<BlockKey> = HashSet::new();
        let mut state = ParseState::Code;
        let mut crlf = None;

        for chunk in text.split_inclusive('\n') {
            let (raw, ending) = LineEnding::split(chunk);
            if crlf.is_none() && ending != LineEnding::Missing {
                crlf = Some(ending == LineEnding::CrLf);
            }
            let Some(current) = blocks.last_mut() else {
                break;
            };
            match state {
                ParseState::Comment => {
                    current.lines.push(CodeLine::comment(raw).with_ending(ending));
                    if raw.contains("*/") {
                        state = ParseState::Code;
                    }
                }
                ParseState::Code => {
                    let trimmed = raw.trim_start();
                    if let Some(rest) = trimmed.strip_prefix("/*") {
                        current.lines.push(CodeLine::comment(raw).with_ending(ending));
                        if !rest.contains("*/") {
                            state = ParseState::Comment;
                        }
                    } else if trimmed.is_empty() || trimmed.starts_with("//") {
                        current.lines.push(CodeLine::comment(raw).with_ending(ending));
                    } else if let Some(key) = matcher.key(raw) {
                        // comments directly above a declaration belong to it
                        let split = current
                            .lines
                            .iter()
                            .rposition(|line| line.is_code || line.is_blank())
                            .map_or(0, |i| i + 1);
                        let mut lines = current.lines.split_off(split);
                        lines.push(CodeLine::new(raw).with_ending(ending));

                        let key = if seen.insert(key.clone()) {
                            Some(key)
                        } else {
                            tracing::warn!("Duplicate block {} treated as plain code", key);
                            None
                        };
                        blocks.push(CodeBlock { key, lines });
                    } else {
                        current.lines.push(CodeLine::new(raw).with_ending(ending));
                    }
                }
            }
        }

        blocks.retain(|block| !block.lines.is_empty());
        let mut file = Self {
            blocks,
            index: HashMap::new(),
            crlf: crlf.unwrap_or(false),
        };
        file.reindex();
        Ok(file)
    }

    /// Parse the file at `path`; a missing file is an empty `CodeFile`
    pub fn load(path: &Path) -> Result<Self, io::Error> {
        let contents = fs_utils::read_optional(path)?.unwrap_or_default();
        Self::parse(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Write the file back in one piece; returns whether the content changed
    pub fn save(&self, path: &Path) -> io::Result<bool> {
        fs_utils::write_if_changed(path, &self.to_string())
    }

    fn reindex(&mut self) {
        self.index = self
            .blocks
            .iter()
            .enumerate()
            .filter_map(|(i, block)| block.key.clone().map(|key| (key, i)))
            .collect();
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    pub fn has_block(&self, key: &BlockKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn block(&self, key: &BlockKey) -> Option<&CodeBlock> {
        self.index.get(key).map(|&i| &self.blocks[i])
    }

    /// Key of the last block of the given kind
    pub fn last_of_kind(&self, kind: BlockKind) -> Option<&BlockKey> {
        self.blocks
            .iter()
            .rev()
            .filter_map(|block| block.key.as_ref())
            .find(|key| key.kind == kind)
    }

    fn block_index(&self, key: &BlockKey) -> Result<usize, PatchError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| PatchError::BlockNotFound(key.clone()))
    }

    fn check_new(&self, block: &CodeBlock) -> Result<(), PatchError> {
        match &block.key {
            Some(key) if self.has_block(key) => Err(PatchError::DuplicateBlock(key.clone())),
            _ => Ok(()),
        }
    }

    pub fn append_block(&mut self, block: CodeBlock) -> Result<(), PatchError> {
        let len = self.blocks.len();
        self.insert_block(len, block)
    }

    pub fn insert_block(&mut self, position: usize, block: CodeBlock) -> Result<(), PatchError> {
        self.check_new(&block)?;
        if position > self.blocks.len() {
            return Err(PatchError::Position {
                position,
                len: self.blocks.len(),
            });
        }
        self.blocks.insert(position, block);
        self.reindex();
        Ok(())
    }

    /// Insert right before the block `key`, together with any comments
    /// attached above it staying with `key`
    pub fn insert_block_before(&mut self, key: &BlockKey, block: CodeBlock) -> Result<(), PatchError> {
        let i = self.block_index(key)?;
        self.insert_block(i, block)
    }

    /// Insert right after the block `key`. Blank lines that separated `key`
    /// from its successor move to the end of the new block.
    pub fn insert_block_after(&mut self, key: &BlockKey, mut block: CodeBlock) -> Result<(), PatchError> {
        self.check_new(&block)?;
        let i = self.block_index(key)?;
        let previous = &mut self.blocks[i];
        let split = previous
            .lines
            .iter()
            .rposition(|line| !line.is_blank())
            .map_or(0, |j| j + 1);
        block.lines.extend(previous.lines.split_off(split));
        self.blocks.insert(i + 1, block);
        self.reindex();
        Ok(())
    }

    /// Insert `line` before the first line of block `key` starting with `prefix`
    pub fn insert_before(&mut self, key: &BlockKey, prefix: &str, line: &str) -> Result<(), PatchError> {
        let i = self.block_index(key)?;
        let block = &mut self.blocks[i];
        let position = block.position(prefix).ok_or_else(|| PatchError::PrefixNotFound {
            key: key.clone(),
            prefix: prefix.to_string(),
        })?;
        block.lines.insert(position, CodeLine::new(line));
        Ok(())
    }

    /// Replace the line of block `key` starting with `prefix`, or insert
    /// `line` before the `fallback` line when there is none
    pub fn update_or_insert(
        &mut self,
        key: &BlockKey,
        prefix: &str,
        line: &str,
        fallback: &str,
    ) -> Result<(), PatchError> {
        let i = self.block_index(key)?;
        let block = &mut self.blocks[i];
        match block.position(prefix) {
            Some(position) => {
                let ending = block.lines[position].ending;
                block.lines[position] = CodeLine::new(line).with_ending(ending);
                Ok(())
            }
            None => self.insert_before(key, fallback, line),
        }
    }

    pub fn block_contains(&self, key: &BlockKey, prefix: &str) -> bool {
        self.block(key).is_some_and(|block| block.contains(prefix))
    }
}

impl fmt::Display for CodeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let newline = if self.crlf { "\r\n" } else { "\n" };
        let mut lines = self.blocks.iter().flat_map(|block| &block.lines).peekable();
        while let Some(line) = lines.next() {
            f.write_str(&line.raw)?;
            let ending = match line.ending {
                LineEnding::Lf => "\n",
                LineEnding::CrLf => "\r\n",
                LineEnding::Native => newline,
                // lines were added after it
                LineEnding::Missing if lines.peek().is_some() => newline,
                LineEnding::Missing => "",
            };
            f.write_str(ending)?;
        }
        Ok(())
    }
}
