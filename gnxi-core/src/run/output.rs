use parking_lot::RwLock;
use serde::Serialize;

/// Lines read from an [`OutputBuffer`] plus the offset to resume from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputChunk {
    pub lines: Vec<String>,
    pub next_offset: usize,
}

/// Append-only log of a run's output.
///
/// One writer (the executor) and any number of polling readers. Lines are
/// addressed by index, so a reader resuming from the offset it was last
/// handed never sees a line twice and never skips one.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    lines: RwLock<Vec<String>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, line: impl Into<String>) {
        self.lines.write().push(line.into());
    }

    /// Lines at or after `offset`. Offsets past the end are clamped.
    pub fn read_from(&self, offset: usize) -> OutputChunk {
        let guard = self.lines.read();
        let start = offset.min(guard.len());
        OutputChunk {
            lines: guard[start..].to_vec(),
            next_offset: guard.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.read().is_empty()
    }
}
