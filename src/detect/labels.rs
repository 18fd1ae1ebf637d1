use std::path::Path;

use anyhow::{anyhow, Context, Result};

use super::result::Detection;

/// Class names of a detector, indexed by class id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassList {
    names: Vec<String>,
}

impl ClassList {
    /// Read one class name per line. Trailing blank lines are ignored.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read class list {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid class list {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut names: Vec<String> = raw.lines().map(|line| line.trim().to_string()).collect();
        while names.last().is_some_and(|name| name.is_empty()) {
            names.pop();
        }
        if names.is_empty() {
            return Err(anyhow!("class list is empty"));
        }
        Ok(Self { names })
    }

    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// `name:0.92`, falling back to `class<id>` for ids outside the list.
    pub fn label(&self, detection: &Detection) -> String {
        match self.name(detection.class_id) {
            Some(name) => format!("{}:{:.2}", name, detection.confidence),
            None => format!("class{}:{:.2}", detection.class_id, detection.confidence),
        }
    }
}
