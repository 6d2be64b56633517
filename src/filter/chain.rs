//! Ordered, pull-based filter pipeline

use crate::error::Result;
use crate::filter::{
    ContentFilter, ExpandDetails, FilterKind, FilterParams, FilteredReader, FilteringCharset,
    LineProcessor, LineTransformer, ReaderTransformer, TemplateExpansion,
};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Read};

/// Ordered list of content filters applied while bytes are read
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    charset: FilteringCharset,
    filters: Vec<ContentFilter>,
}

impl FilterChain {
    /// Create an empty chain decoding text with `charset`
    pub fn new(charset: FilteringCharset) -> Self {
        Self {
            charset,
            filters: Vec::new(),
        }
    }

    /// Charset used by text stages
    pub fn charset(&self) -> FilteringCharset {
        self.charset
    }

    /// Append a stage
    pub fn add(&mut self, filter: ContentFilter) {
        self.filters.push(filter);
    }

    /// Append a line transform; returning `None` drops the line
    pub fn add_transformer<F>(&mut self, transform: F)
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.add(ContentFilter::Transform(LineTransformer::new(transform)));
    }

    /// Append a transform over the whole byte stream
    ///
    /// The closure receives the upstream reader and returns the reader that
    /// later stages pull from. It sees line terminators and raw bytes.
    pub fn add_reader<F>(&mut self, transform: F)
    where
        F: Fn(FilteredReader) -> FilteredReader + Send + Sync + 'static,
    {
        self.add(ContentFilter::Reader(ReaderTransformer::new(transform)));
    }

    /// Append a parameterized filter
    pub fn add_filter(&mut self, kind: FilterKind, params: &FilterParams) -> Result<()> {
        let filter = kind.build(params)?;
        self.add(filter);
        Ok(())
    }

    /// Append a parameterized filter with default parameters
    pub fn add_kind(&mut self, kind: FilterKind) -> Result<()> {
        self.add_filter(kind, &FilterParams::default())
    }

    /// Append a template substitution stage
    pub fn expand(&mut self, properties: BTreeMap<String, String>, escape_backslash: bool) {
        self.add(ContentFilter::Expand(TemplateExpansion::new(
            properties,
            escape_backslash,
        )));
    }

    /// Append a template substitution stage configured through `ExpandDetails`
    pub fn expand_with<F>(&mut self, properties: BTreeMap<String, String>, configure: F)
    where
        F: FnOnce(&mut ExpandDetails),
    {
        let mut details = ExpandDetails::default();
        configure(&mut details);
        self.expand(properties, details.escape_backslash);
    }

    /// Append every stage of `other`, keeping its order
    pub fn extend_from(&mut self, other: &FilterChain) {
        self.filters.extend(other.filters.iter().cloned());
    }

    /// Whether at least one stage is registered
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Number of registered stages
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether no stage is registered
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Wrap `input` so that every stage runs, in order, as bytes are pulled
    ///
    /// Nothing is read until the returned reader is read.
    pub fn transform<R: Read + Send + 'static>(&self, input: R) -> FilteredReader {
        let mut reader: FilteredReader = Box::new(input);
        for filter in &self.filters {
            reader = filter.apply(reader, self.charset);
        }
        reader
    }
}

/// Applies one [`LineProcessor`] to a byte stream, a line at a time
pub struct LineFilterReader<R> {
    inner: R,
    processor: Box<dyn LineProcessor>,
    charset: FilteringCharset,
    line: Vec<u8>,
    out: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<R: BufRead> LineFilterReader<R> {
    /// Create a reader over `inner`
    pub fn new(inner: R, processor: Box<dyn LineProcessor>, charset: FilteringCharset) -> Self {
        Self {
            inner,
            processor,
            charset,
            line: Vec::new(),
            out: Vec::new(),
            pos: 0,
            done: false,
        }
    }

    fn fill_next(&mut self) -> io::Result<()> {
        self.out.clear();
        self.pos = 0;
        self.line.clear();

        if self.inner.read_until(b'\n', &mut self.line)? == 0 {
            self.done = true;
            return Ok(());
        }

        let terminator = if self.line.ends_with(b"\r\n") {
            2
        } else if self.line.ends_with(b"\n") {
            1
        } else {
            0
        };
        let (body, ending) = self.line.split_at(self.line.len() - terminator);
        let text = self.charset.decode(body)?;
        if let Some(filtered) = self.processor.process(&text)? {
            self.charset.encode(&filtered, &mut self.out)?;
            self.out.extend_from_slice(ending);
        }
        Ok(())
    }
}

impl<R: BufRead> Read for LineFilterReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.out.len() {
            if self.done {
                return Ok(0);
            }
            self.fill_next()?;
        }
        let n = buf.len().min(self.out.len() - self.pos);
        buf[..n].copy_from_slice(&self.out[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
