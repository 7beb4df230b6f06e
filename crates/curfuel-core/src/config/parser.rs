//! INI reader
//!
//! Minimal reader for the daemon's configuration file: `[section]` headers,
//! `key = value` or `key: value` entries, `#`/`;` comments. Keys are case
//! insensitive, section names are not.

use std::collections::HashMap;
use std::path::Path;

use super::ConfigError;

/// Parsed sections of an INI file
#[derive(Debug, Clone, Default)]
pub struct IniDocument {
    sections: HashMap<String, HashMap<String, String>>,
}

impl IniDocument {
    /// Parse INI content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut doc = IniDocument::default();
        let mut current_section: Option<String> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = strip_comment(raw);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('[') {
                if !line.ends_with(']') {
                    return Err(ConfigError::ParseError {
                        line: line_no,
                        message: format!("unterminated section header '{}'", line),
                    });
                }
                let name = line[1..line.len() - 1].trim().to_string();
                doc.sections.entry(name.clone()).or_default();
                current_section = Some(name);
                continue;
            }

            let Some((key, value)) = parse_key_value(line) else {
                return Err(ConfigError::ParseError {
                    line: line_no,
                    message: format!("expected 'key = value', got '{}'", line),
                });
            };

            let Some(section) = current_section.as_ref() else {
                return Err(ConfigError::ParseError {
                    line: line_no,
                    message: format!("'{}' appears before any section header", key),
                });
            };

            doc.sections
                .entry(section.clone())
                .or_default()
                .insert(key.to_lowercase(), value.to_string());
        }

        Ok(doc)
    }

    /// Read and parse an INI file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Whether a section exists
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Look up a value, `None` if the section or key is missing
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)?
            .get(&key.to_lowercase())
            .map(String::as_str)
    }

    /// Look up a value that must be present
    pub fn require(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        if !self.has_section(section) {
            return Err(ConfigError::MissingSectionError(section.to_string()));
        }
        self.get(section, key)
            .ok_or_else(|| ConfigError::MissingFieldError {
                section: section.to_string(),
                field: key.to_string(),
            })
    }
}

/// Strip comments from a line. Full-line `#`/`;` comments and inline
/// comments introduced by whitespace followed by `;` or `#`.
fn strip_comment(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with(';') {
        return "";
    }

    let bytes = line.as_bytes();
    for i in 1..bytes.len() {
        if (bytes[i] == b';' || bytes[i] == b'#') && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}

/// Parse a `key = value` or `key: value` line, splitting on whichever
/// delimiter comes first
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let split = line.find(['=', ':'])?;
    let key = line[..split].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[split + 1..].trim()))
}
