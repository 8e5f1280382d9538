//! Minimal ordered INI document.
//!
//! Sections and keys keep the order they were read or inserted in, so
//! rendering is deterministic. Supports `key=value` and `key: value`, blank
//! lines, and whole-line `#` / `;` comments. Keys are case-sensitive.

use super::codec::ConfigParseError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniSection {
    pub name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a key, replacing any previous value in place
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text. Pure function - no I/O.
    pub fn parse(text: &str) -> Result<Self, ConfigParseError> {
        let mut doc = IniDocument::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| syntax(line_no, "malformed section header"))?;
                if doc.section(name).is_some() {
                    return Err(syntax(line_no, &format!("duplicate section [{}]", name)));
                }
                doc.sections.push(IniSection::new(name));
                continue;
            }

            let split_at = line
                .find(['=', ':'])
                .ok_or_else(|| syntax(line_no, "expected 'key=value'"))?;
            let key = line[..split_at].trim();
            let value = line[split_at + 1..].trim();
            if key.is_empty() {
                return Err(syntax(line_no, "empty key"));
            }

            let section = doc
                .sections
                .last_mut()
                .ok_or_else(|| syntax(line_no, "key outside of any section"))?;
            if section.get(key).is_some() {
                return Err(syntax(
                    line_no,
                    &format!("duplicate key '{}' in [{}]", key, section.name),
                ));
            }
            section.entries.push((key.to_string(), value.to_string()));
        }

        Ok(doc)
    }

    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn sections(&self) -> &[IniSection] {
        &self.sections
    }

    /// Append a new section and return it for filling
    pub fn push_section(&mut self, name: impl Into<String>) -> &mut IniSection {
        self.sections.push(IniSection::new(name));
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    /// Render as text: `key=value` lines, a blank line between sections.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", section.name));
            for (key, value) in section.entries() {
                out.push_str(&format!("{}={}\n", key, value));
            }
        }
        out
    }
}

fn syntax(line: usize, message: &str) -> ConfigParseError {
    ConfigParseError::Syntax {
        line,
        message: message.to_string(),
    }
}
