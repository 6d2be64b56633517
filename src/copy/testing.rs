//! In-memory source elements and readers for unit tests

use crate::copy::{RelativePath, SourceElement};
use crate::error::{CopySpecError, Result};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

pub(crate) struct MemoryElement {
    pub relative: RelativePath,
    pub content: Vec<u8>,
    pub mode: Option<u32>,
    pub file: Option<PathBuf>,
    pub stopped: Arc<AtomicBool>,
}

impl MemoryElement {
    pub fn file(path: &str, content: &[u8]) -> Self {
        Self {
            relative: RelativePath::parse(true, path),
            content: content.to_vec(),
            mode: None,
            file: None,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn dir(path: &str) -> Self {
        Self {
            relative: RelativePath::parse(false, path),
            ..Self::file(path, b"")
        }
    }

    pub fn with_mode(mut self, mode: Option<u32>) -> Self {
        self.mode = mode;
        self
    }
}

impl SourceElement for MemoryElement {
    fn name(&self) -> &str {
        self.relative.last_name().unwrap_or("")
    }

    fn relative_path(&self) -> &RelativePath {
        &self.relative
    }

    fn is_directory(&self) -> bool {
        !self.relative.is_file()
    }

    fn last_modified(&self) -> Option<SystemTime> {
        None
    }

    fn size(&self) -> u64 {
        self.content.len() as u64
    }

    fn mode(&self) -> Option<u32> {
        self.mode
    }

    fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn open(&self) -> Result<Box<dyn Read + Send>> {
        if self.is_directory() {
            return Err(CopySpecError::unsupported("cannot open a directory"));
        }
        Ok(Box::new(Cursor::new(self.content.clone())))
    }

    fn stop_visiting(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Emits every byte of `inner` twice
pub(crate) struct DoublingReader<R> {
    inner: R,
    pending: Option<u8>,
}

impl<R: Read> DoublingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: None,
        }
    }
}

impl<R: Read> Read for DoublingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.pending.take() {
            buf[0] = byte;
            return Ok(1);
        }
        let mut one = [0u8; 1];
        if self.inner.read(&mut one)? == 0 {
            return Ok(0);
        }
        buf[0] = one[0];
        if buf.len() > 1 {
            buf[1] = one[0];
            Ok(2)
        } else {
            self.pending = Some(one[0]);
            Ok(1)
        }
    }
}
