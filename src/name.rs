use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Hierarchical name made of string components, written `/a/b/c`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Name {
    components: Vec<String>,
}

impl Name {
    pub fn new() -> Self {
        Self { components: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Component at `index`; negative indexes count from the end.
    pub fn get(&self, index: isize) -> Option<&str> {
        let idx = if index < 0 {
            self.components.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.components.get(idx).map(String::as_str)
    }

    pub fn append(mut self, component: impl Into<String>) -> Self {
        self.push(component);
        self
    }

    pub fn append_name(mut self, other: &Name) -> Self {
        self.components.extend(other.components.iter().cloned());
        self
    }

    pub fn append_number(self, number: u64) -> Self {
        self.append(number.to_string())
    }

    pub fn push(&mut self, component: impl Into<String>) {
        self.components.push(component.into());
    }

    /// Components in `[start, start + len)`, clamped to the name length.
    pub fn sub_name(&self, start: usize, len: usize) -> Name {
        let end = start.saturating_add(len).min(self.components.len());
        let start = start.min(end);
        Name {
            components: self.components[start..end].to_vec(),
        }
    }

    /// Everything from `start` to the end.
    pub fn suffix_from(&self, start: usize) -> Name {
        self.sub_name(start, usize::MAX)
    }

    /// The name without its last component.
    pub fn parent(&self) -> Name {
        self.sub_name(0, self.components.len().saturating_sub(1))
    }

    /// Position of the first component equal to `component`.
    pub fn position_of(&self, component: &str) -> Option<usize> {
        self.components.iter().position(|c| c == component)
    }

    pub fn is_prefix_of(&self, other: &Name) -> bool {
        other.components.starts_with(&self.components)
    }

    /// Interprets the last component as a decimal number.
    pub fn last_number(&self) -> Option<u64> {
        self.get(-1)?.parse().ok()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !trimmed.starts_with('/') {
            return Err(Error::MalformedName {
                name: s.to_string(),
                reason: "name must start with '/'",
            });
        }
        Ok(Name {
            components: trimmed
                .split('/')
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.to_string()
    }
}

impl TryFrom<String> for Name {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_displays() {
        let n = name("/ndn/NLSR/LSA/site/router");
        assert_eq!(n.len(), 5);
        assert_eq!(n.to_string(), "/ndn/NLSR/LSA/site/router");
        assert_eq!(name("/").to_string(), "/");
        assert!("ndn/site".parse::<Name>().is_err());
    }

    #[test]
    fn negative_index_counts_from_end() {
        let n = name("/a/b/adjacency/42");
        assert_eq!(n.get(-1), Some("42"));
        assert_eq!(n.get(-2), Some("adjacency"));
        assert_eq!(n.get(-5), None);
        assert_eq!(n.last_number(), Some(42));
    }

    #[test]
    fn sub_names_are_clamped() {
        let n = name("/a/b/c/d");
        assert_eq!(n.sub_name(1, 2), name("/b/c"));
        assert_eq!(n.sub_name(3, 10), name("/d"));
        assert_eq!(n.sub_name(9, 1), Name::new());
        assert_eq!(n.parent(), name("/a/b/c"));
        assert_eq!(n.suffix_from(2), name("/c/d"));
    }

    #[test]
    fn serializes_as_uri_string() {
        let n = name("/ndn/site/router");
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, "\"/ndn/site/router\"");
        let back: Name = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
    }
}
