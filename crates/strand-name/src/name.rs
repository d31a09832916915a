//! Hierarchical names

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::component::Component;
use crate::error::NameError;
use crate::Result;

/// An immutable, ordered sequence of components.
///
/// Builder methods consume `self` and return the extended name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_components(components: Vec<Component>) -> Self {
        Self { components }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Component at `index`; negative indices count from the end (`-1` is the last)
    pub fn get(&self, index: isize) -> Option<&Component> {
        let resolved = if index < 0 {
            self.components.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.components.get(resolved)
    }

    pub fn append(mut self, component: impl Into<Component>) -> Self {
        self.components.push(component.into());
        self
    }

    pub fn append_sequence_number(self, n: u64) -> Self {
        self.append(Component::SequenceNumber(n))
    }

    pub fn append_implicit_digest(self, digest: [u8; 32]) -> Self {
        self.append(Component::ImplicitSha256Digest(digest))
    }

    /// Up to `count` components starting at `start`
    pub fn sub_name(&self, start: usize, count: usize) -> Name {
        let start = start.min(self.components.len());
        let end = start.saturating_add(count).min(self.components.len());
        Name::from_components(self.components[start..end].to_vec())
    }

    /// The first `count` components
    pub fn prefix(&self, count: usize) -> Name {
        self.sub_name(0, count)
    }

    /// This name without its trailing implicit digest, if it has one
    pub fn without_digest(&self) -> Name {
        match self.components.last() {
            Some(last) if last.is_implicit_digest() => self.prefix(self.len() - 1),
            _ => self.clone(),
        }
    }

    pub fn is_prefix_of(&self, other: &Name) -> bool {
        other.components.starts_with(&self.components)
    }

    pub fn wire_bytes(&self) -> Vec<u8> {
        self.components
            .iter()
            .flat_map(|c| c.wire_bytes())
            .collect()
    }

    pub fn to_uri(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        self.components
            .iter()
            .map(|c| format!("/{}", c.to_uri()))
            .collect()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let path = s
            .strip_prefix("ndn:")
            .unwrap_or(s)
            .strip_prefix('/')
            .ok_or_else(|| NameError::InvalidUri(s.to_string()))?;

        if path.is_empty() {
            return Ok(Name::new());
        }

        let components = path
            .trim_end_matches('/')
            .split('/')
            .map(Component::parse)
            .collect::<Result<Vec<_>>>()?;

        Ok(Name::from_components(components))
    }
}

impl From<Vec<Component>> for Name {
    fn from(components: Vec<Component>) -> Self {
        Name::from_components(components)
    }
}
