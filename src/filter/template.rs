//! `$name` / `${name}` template expansion

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

/// Options for an expansion stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandDetails {
    /// Treat every backslash literally instead of as an escape
    pub escape_backslash: bool,
}

/// Substitutes properties into each line
#[derive(Debug, Clone)]
pub struct TemplateExpansion {
    properties: Arc<BTreeMap<String, String>>,
    escape_backslash: bool,
}

impl TemplateExpansion {
    /// Create an expansion over the given properties
    pub fn new(properties: BTreeMap<String, String>, escape_backslash: bool) -> Self {
        Self {
            properties: Arc::new(properties),
            escape_backslash,
        }
    }

    /// Whether backslashes are kept literally
    pub fn escape_backslash(&self) -> bool {
        self.escape_backslash
    }

    /// Expand a single line
    pub fn expand_line(&self, line: &str) -> io::Result<String> {
        let chars: Vec<char> = line.chars().collect();
        let mut out = String::with_capacity(line.len());
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c == '\\' && !self.escape_backslash && i + 1 < chars.len() {
                if let Some(escaped) = unescape(chars[i + 1]) {
                    out.push(escaped);
                    i += 2;
                    continue;
                }
            }

            if c == '$' && i + 1 < chars.len() {
                if chars[i + 1] == '{' {
                    let close = chars[i + 2..]
                        .iter()
                        .position(|&ch| ch == '}')
                        .map(|offset| i + 2 + offset)
                        .ok_or_else(|| {
                            invalid_data(format!("Unterminated '${{' in template line: {}", line))
                        })?;
                    let name: String = chars[i + 2..close].iter().collect();
                    out.push_str(self.lookup(name.trim())?);
                    i = close + 1;
                    continue;
                }
                if is_ident_start(chars[i + 1]) {
                    let mut end = i + 1;
                    while end < chars.len() && is_ident_part(chars[end]) {
                        end += 1;
                    }
                    let name: String = chars[i + 1..end].iter().collect();
                    out.push_str(self.lookup(&name)?);
                    i = end;
                    continue;
                }
            }

            out.push(c);
            i += 1;
        }

        Ok(out)
    }

    fn lookup(&self, name: &str) -> io::Result<&str> {
        self.properties
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| invalid_data(format!("Missing property '{}'", name)))
    }
}

fn unescape(c: char) -> Option<char> {
    match c {
        '\\' => Some('\\'),
        '$' => Some('$'),
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '"' => Some('"'),
        '\'' => Some('\''),
        _ => None,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expansion(escape_backslash: bool) -> TemplateExpansion {
        let mut props = BTreeMap::new();
        props.insert("name".to_string(), "copyspec".to_string());
        props.insert("version".to_string(), "1.2".to_string());
        props.insert("app.home".to_string(), "/opt/app".to_string());
        TemplateExpansion::new(props, escape_backslash)
    }

    #[test]
    fn test_both_placeholder_forms() {
        let line = expansion(false).expand_line("$name v${version} at ${ app.home }").unwrap();
        assert_eq!(line, "copyspec v1.2 at /opt/app");
    }

    #[test]
    fn test_missing_property_fails() {
        let err = expansion(false).expand_line("hello $nobody").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("Missing property 'nobody'"));
    }

    #[test]
    fn test_escapes_interpreted_by_default() {
        let line = expansion(false).expand_line(r"cost \$5\tC:\\dir \q").unwrap();
        assert_eq!(line, "cost $5\tC:\\dir \\q");
    }

    #[test]
    fn test_escape_backslash_keeps_backslashes() {
        let line = expansion(true).expand_line(r"C:\new\$name").unwrap();
        assert_eq!(line, r"C:\new\copyspec");
    }

    #[test]
    fn test_lone_dollar_is_literal() {
        let line = expansion(false).expand_line("costs 5$ or $1").unwrap();
        assert_eq!(line, "costs 5$ or $1");
    }

    #[test]
    fn test_unterminated_brace() {
        assert!(expansion(false).expand_line("${name").is_err());
    }
}
