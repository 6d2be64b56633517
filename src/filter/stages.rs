//! Filter stage definitions
//!
//! Every stage is a variant of [`ContentFilter`]. Most process text one
//! line at a time; [`ContentFilter::Reader`] wraps the raw byte stream.
//! Parameterized stages are built from a [`FilterKind`] and a
//! [`FilterParams`] bag; the name table in [`FilterKind::TABLE`] is the
//! only lookup.

use crate::error::{CopySpecError, Result};
use crate::filter::{FilteringCharset, LineFilterReader, TemplateExpansion};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufReader, Read};
use std::str::FromStr;
use std::sync::Arc;

/// Per-stream state of one stage
pub trait LineProcessor: Send {
    /// Transform one line (terminator excluded); `None` drops it
    fn process(&mut self, line: &str) -> io::Result<Option<String>>;
}

/// User supplied line transform
#[derive(Clone)]
pub struct LineTransformer(Arc<dyn Fn(&str) -> Option<String> + Send + Sync>);

impl LineTransformer {
    /// Wrap a closure
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(transform))
    }

    /// Apply the transform to one line
    pub fn apply(&self, line: &str) -> Option<String> {
        (*self.0)(line)
    }
}

impl fmt::Debug for LineTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LineTransformer(..)")
    }
}

/// A filtered byte stream
pub type FilteredReader = Box<dyn Read + Send>;

/// User supplied transform over the whole byte stream
#[derive(Clone)]
pub struct ReaderTransformer(Arc<dyn Fn(FilteredReader) -> FilteredReader + Send + Sync>);

impl ReaderTransformer {
    /// Wrap a closure that decorates the upstream reader
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(FilteredReader) -> FilteredReader + Send + Sync + 'static,
    {
        Self(Arc::new(transform))
    }

    /// Decorate `input`
    pub fn apply(&self, input: FilteredReader) -> FilteredReader {
        (*self.0)(input)
    }
}

impl fmt::Debug for ReaderTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReaderTransformer(..)")
    }
}

/// One registered stage of a filter chain
#[derive(Debug, Clone)]
pub enum ContentFilter {
    /// Arbitrary line transform
    Transform(LineTransformer),
    /// Arbitrary byte stream transform, line terminators included
    Reader(ReaderTransformer),
    /// Replace `<begin>key<end>` tokens
    ReplaceTokens {
        /// Token values by key
        tokens: BTreeMap<String, String>,
        /// Opening delimiter
        begin: String,
        /// Closing delimiter
        end: String,
    },
    /// Keep `lines` lines after skipping `skip`
    HeadLines {
        /// Lines to keep
        lines: usize,
        /// Lines to skip first
        skip: usize,
    },
    /// Replace tabs with spaces up to the next tab stop
    ExpandTabs {
        /// Tab stop width
        width: usize,
    },
    /// Drop lines starting with a comment prefix
    StripLineComments {
        /// Comment prefixes
        prefixes: Vec<String>,
    },
    /// Prepend a fixed prefix to each line
    PrefixLines {
        /// Prefix text
        prefix: String,
    },
    /// Template substitution
    Expand(TemplateExpansion),
}

impl ContentFilter {
    /// Stack this stage on top of `input`
    pub fn apply(&self, input: FilteredReader, charset: FilteringCharset) -> FilteredReader {
        if let Self::Reader(transformer) = self {
            return transformer.apply(input);
        }
        match self.processor() {
            Some(processor) => {
                Box::new(LineFilterReader::new(BufReader::new(input), processor, charset))
            }
            None => input,
        }
    }

    /// Fresh per-stream line processor; `None` for whole-stream stages
    pub fn processor(&self) -> Option<Box<dyn LineProcessor>> {
        let processor: Box<dyn LineProcessor> = match self {
            Self::Reader(_) => return None,
            Self::Transform(transformer) => Box::new(TransformProcessor(transformer.clone())),
            Self::ReplaceTokens { tokens, begin, end } => Box::new(ReplaceTokensProcessor {
                tokens: tokens.clone(),
                begin: begin.clone(),
                end: end.clone(),
            }),
            Self::HeadLines { lines, skip } => Box::new(HeadLinesProcessor {
                lines: *lines,
                skip: *skip,
                seen: 0,
            }),
            Self::ExpandTabs { width } => Box::new(ExpandTabsProcessor { width: *width }),
            Self::StripLineComments { prefixes } => Box::new(StripCommentsProcessor {
                prefixes: prefixes.clone(),
            }),
            Self::PrefixLines { prefix } => Box::new(PrefixProcessor {
                prefix: prefix.clone(),
            }),
            Self::Expand(expansion) => Box::new(ExpandProcessor(expansion.clone())),
        };
        Some(processor)
    }
}

/// Parameterized filter kinds
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    /// `tokens`, `begin`, `end`
    ReplaceTokens,
    /// `lines`, `skip`
    HeadLines,
    /// `width`
    ExpandTabs,
    /// `prefixes`
    StripLineComments,
    /// `prefix`
    PrefixLines,
}

impl FilterKind {
    /// Registered filter names
    pub const TABLE: &'static [(&'static str, FilterKind)] = &[
        ("replace-tokens", FilterKind::ReplaceTokens),
        ("head-lines", FilterKind::HeadLines),
        ("expand-tabs", FilterKind::ExpandTabs),
        ("strip-line-comments", FilterKind::StripLineComments),
        ("prefix-lines", FilterKind::PrefixLines),
    ];

    /// Look a kind up by its registered name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, kind)| *kind)
    }

    /// Registered name
    pub fn name(&self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    fn allowed_params(&self) -> &'static [&'static str] {
        match self {
            Self::ReplaceTokens => &["tokens", "begin", "end"],
            Self::HeadLines => &["lines", "skip"],
            Self::ExpandTabs => &["width"],
            Self::StripLineComments => &["prefixes"],
            Self::PrefixLines => &["prefix"],
        }
    }

    /// Build a typed stage from a parameter bag
    pub fn build(&self, params: &FilterParams) -> Result<ContentFilter> {
        params.check_known(*self, self.allowed_params())?;
        let filter = match self {
            Self::ReplaceTokens => {
                let begin = params.string(*self, "begin")?.unwrap_or_else(|| "@".to_string());
                let end = params.string(*self, "end")?.unwrap_or_else(|| "@".to_string());
                if begin.is_empty() || end.is_empty() {
                    return Err(params.error(*self, "token delimiters must not be empty"));
                }
                ContentFilter::ReplaceTokens {
                    tokens: params.string_map(*self, "tokens")?.unwrap_or_default(),
                    begin,
                    end,
                }
            }
            Self::HeadLines => ContentFilter::HeadLines {
                lines: params
                    .usize(*self, "lines")?
                    .ok_or_else(|| params.error(*self, "parameter 'lines' is required"))?,
                skip: params.usize(*self, "skip")?.unwrap_or(0),
            },
            Self::ExpandTabs => {
                let width = params.usize(*self, "width")?.unwrap_or(8);
                if width == 0 {
                    return Err(params.error(*self, "parameter 'width' must be positive"));
                }
                ContentFilter::ExpandTabs { width }
            }
            Self::StripLineComments => ContentFilter::StripLineComments {
                prefixes: params
                    .string_list(*self, "prefixes")?
                    .ok_or_else(|| params.error(*self, "parameter 'prefixes' is required"))?,
            },
            Self::PrefixLines => ContentFilter::PrefixLines {
                prefix: params
                    .string(*self, "prefix")?
                    .ok_or_else(|| params.error(*self, "parameter 'prefix' is required"))?,
            },
        };
        Ok(filter)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = CopySpecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s.trim()).ok_or_else(|| {
            let known: Vec<&str> = Self::TABLE.iter().map(|(name, _)| *name).collect();
            CopySpecError::invalid_input(format!(
                "Unknown filter '{}', expected one of: {}",
                s,
                known.join(", ")
            ))
        })
    }
}

/// Untyped parameter bag for a parameterized filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterParams(BTreeMap<String, Value>);

impl FilterParams {
    /// Empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a parameter
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Whether the bag is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn error(&self, kind: FilterKind, message: &str) -> CopySpecError {
        CopySpecError::invalid_input(format!("filter '{}': {}", kind, message))
    }

    fn check_known(&self, kind: FilterKind, allowed: &[&str]) -> Result<()> {
        match self.0.keys().find(|key| !allowed.contains(&key.as_str())) {
            Some(key) => Err(self.error(kind, &format!("unknown parameter '{}'", key))),
            None => Ok(()),
        }
    }

    fn string(&self, kind: FilterKind, key: &str) -> Result<Option<String>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.error(kind, &format!("parameter '{}' must be a string", key))),
        }
    }

    fn usize(&self, kind: FilterKind, key: &str) -> Result<Option<usize>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| {
                    self.error(kind, &format!("parameter '{}' must be a non-negative integer", key))
                }),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| {
                self.error(kind, &format!("parameter '{}' must be a non-negative integer", key))
            }),
            Some(_) => Err(self.error(
                kind,
                &format!("parameter '{}' must be a non-negative integer", key),
            )),
        }
    }

    fn string_list(&self, kind: FilterKind, key: &str) -> Result<Option<Vec<String>>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(self.error(kind, &format!("parameter '{}' must hold strings", key))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(_) => Err(self.error(kind, &format!("parameter '{}' must be a list", key))),
        }
    }

    fn string_map(&self, kind: FilterKind, key: &str) -> Result<Option<BTreeMap<String, String>>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k.clone(), s.clone())),
                    Value::Number(n) => Ok((k.clone(), n.to_string())),
                    Value::Bool(b) => Ok((k.clone(), b.to_string())),
                    _ => Err(self.error(kind, &format!("value of '{}.{}' must be a scalar", key, k))),
                })
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Some),
            Some(_) => Err(self.error(kind, &format!("parameter '{}' must be a map", key))),
        }
    }
}

struct TransformProcessor(LineTransformer);

impl LineProcessor for TransformProcessor {
    fn process(&mut self, line: &str) -> io::Result<Option<String>> {
        Ok(self.0.apply(line))
    }
}

struct ReplaceTokensProcessor {
    tokens: BTreeMap<String, String>,
    begin: String,
    end: String,
}

impl LineProcessor for ReplaceTokensProcessor {
    fn process(&mut self, line: &str) -> io::Result<Option<String>> {
        let mut out = String::with_capacity(line.len());
        let mut rest = line;
        while let Some(start) = rest.find(&self.begin) {
            out.push_str(&rest[..start]);
            let after = &rest[start + self.begin.len()..];
            let value = after
                .find(&self.end)
                .and_then(|stop| self.tokens.get(&after[..stop]).map(|v| (stop, v)));
            match value {
                Some((stop, value)) => {
                    out.push_str(value);
                    rest = &after[stop + self.end.len()..];
                }
                None => {
                    out.push_str(&self.begin);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        Ok(Some(out))
    }
}

struct HeadLinesProcessor {
    lines: usize,
    skip: usize,
    seen: usize,
}

impl LineProcessor for HeadLinesProcessor {
    fn process(&mut self, line: &str) -> io::Result<Option<String>> {
        let index = self.seen;
        self.seen += 1;
        if index < self.skip || index >= self.skip.saturating_add(self.lines) {
            return Ok(None);
        }
        Ok(Some(line.to_string()))
    }
}

struct ExpandTabsProcessor {
    width: usize,
}

impl LineProcessor for ExpandTabsProcessor {
    fn process(&mut self, line: &str) -> io::Result<Option<String>> {
        let mut out = String::with_capacity(line.len());
        let mut column = 0;
        for c in line.chars() {
            if c == '\t' {
                let pad = self.width - column % self.width;
                out.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            } else {
                out.push(c);
                column += 1;
            }
        }
        Ok(Some(out))
    }
}

struct StripCommentsProcessor {
    prefixes: Vec<String>,
}

impl LineProcessor for StripCommentsProcessor {
    fn process(&mut self, line: &str) -> io::Result<Option<String>> {
        let trimmed = line.trim_start();
        if self.prefixes.iter().any(|p| trimmed.starts_with(p.as_str())) {
            Ok(None)
        } else {
            Ok(Some(line.to_string()))
        }
    }
}

struct PrefixProcessor {
    prefix: String,
}

impl LineProcessor for PrefixProcessor {
    fn process(&mut self, line: &str) -> io::Result<Option<String>> {
        Ok(Some(format!("{}{}", self.prefix, line)))
    }
}

struct ExpandProcessor(TemplateExpansion);

impl LineProcessor for ExpandProcessor {
    fn process(&mut self, line: &str) -> io::Result<Option<String>> {
        self.0.expand_line(line).map(Some)
    }
}
