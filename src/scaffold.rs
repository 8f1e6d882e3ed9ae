//! Starter files for `gsheet-init init`

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// A template shipped with the crate and where it is copied to.
pub struct Template {
    pub file_name: &'static str,
    pub contents: &'static str,
}

pub const TEMPLATES: [Template; 2] = [
    Template {
        file_name: ".env",
        contents: include_str!("../config_templates/.env.example"),
    },
    Template {
        file_name: "service_account.json",
        contents: include_str!("../config_templates/service_account.example.json"),
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateStatus {
    Created,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateResult {
    pub path: PathBuf,
    pub file_name: &'static str,
    pub status: TemplateStatus,
}

impl fmt::Display for TemplateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            TemplateStatus::Created => write!(f, "✅  {} created.", self.file_name),
            TemplateStatus::Skipped => write!(f, "⚠️  {} already exists, skipped.", self.file_name),
        }
    }
}

/// Copy every template into `dir`, leaving existing files untouched.
pub fn write_templates(dir: &Path) -> io::Result<Vec<TemplateResult>> {
    let mut results = Vec::with_capacity(TEMPLATES.len());
    for template in &TEMPLATES {
        let path = dir.join(template.file_name);
        let status = if path.exists() {
            TemplateStatus::Skipped
        } else {
            std::fs::write(&path, template.contents)?;
            TemplateStatus::Created
        };
        results.push(TemplateResult {
            path,
            file_name: template.file_name,
            status,
        });
    }
    Ok(results)
}
