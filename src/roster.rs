use std::path::Path;

use anyhow::Context;
use tracing::{debug, warn};

use crate::models::Student;

/// Read-only student list keyed by register number.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    students: Vec<Student>,
}

impl Roster {
    /// A missing roster file yields an empty roster, so login is simply unavailable.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no roster file, continuing without login");
            return Ok(Roster::default());
        }

        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open roster {}", path.display()))?;
        let mut students = Vec::new();

        for result in reader.deserialize::<Student>() {
            match result {
                Ok(student) => students.push(student),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping roster row"),
            }
        }

        Ok(Roster { students })
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// First entry whose register number matches the trimmed input.
    pub fn lookup(&self, regno: &str) -> Option<&Student> {
        let regno = regno.trim();
        if regno.is_empty() {
            return None;
        }
        self.students.iter().find(|student| student.regno.trim() == regno)
    }
}
