//! Line-preserving editing of Conan's INI-like `conanfile.txt`.
//!
//! The file is kept as a list of lines *including* their terminators, so that
//! everything the edit does not touch is written back byte-for-byte.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};

const REQUIRES_SECTION: &str = "[requires]";
pub const CONANFILE_NAME: &str = "conanfile.txt";
pub const BUILD_INFO_NAME: &str = "conanbuildinfo.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conanfile {
    lines: Vec<String>,
}

fn is_section_header(line: &str) -> bool {
    let line = line.trim();
    line.starts_with('[') && line.ends_with(']')
}

/// Name part of a requirement reference such as `grpc/1.50.1@user/stable`.
fn requirement_name(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || is_section_header(line) {
        return None;
    }
    Some(line.split('/').next().unwrap_or(line).trim())
}

fn line_terminator(line: &str) -> &str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

impl Conanfile {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::parse(&text))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|e| Error::io(path, e))
    }

    pub fn render(&self) -> String {
        self.lines.concat()
    }

    /// Line ranges `[start, end)` of every `[requires]` section body, i.e. the
    /// lines between such a header and the next header (or end of file).
    fn requires_sections(&self) -> Vec<(usize, usize)> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.trim() == REQUIRES_SECTION)
            .map(|(header, _)| {
                let end = self.lines[header + 1..]
                    .iter()
                    .position(|l| is_section_header(l))
                    .map_or(self.lines.len(), |offset| header + 1 + offset);
                (header + 1, end)
            })
            .collect()
    }

    /// Where a new requirement goes: right after the last non-blank line of the
    /// section (the header when the section is empty), so blank separator lines
    /// before the following section stay in place.
    fn find_insertion_index(&self, body_start: usize, body_end: usize) -> usize {
        (body_start..body_end)
            .rev()
            .find(|&i| !self.lines[i].trim().is_empty())
            .map_or(body_start, |i| i + 1)
    }

    /// Adds `name/version` to `[requires]`, replacing any existing requirement
    /// on `name` in any `[requires]` section. Applying the same call twice
    /// leaves the file unchanged.
    pub fn add_requirement(&mut self, name: &str, version: &str) {
        let reference = format!("{name}/{version}");

        let sections = self.requires_sections();
        let Some(&(start, end)) = sections.first() else {
            debug!(%reference, "No [requires] section, appending one");
            if self.lines.last().is_some_and(|l| line_terminator(l).is_empty()) {
                if let Some(last) = self.lines.last_mut() {
                    last.push('\n');
                }
            }
            self.lines.push(format!("{REQUIRES_SECTION}\n"));
            self.lines.push(format!("{reference}\n"));
            return;
        };

        let matching: Vec<usize> = sections
            .iter()
            .flat_map(|&(body_start, body_end)| body_start..body_end)
            .filter(|&i| requirement_name(&self.lines[i]) == Some(name))
            .collect();

        match matching.split_first() {
            Some((&first, duplicates)) => {
                let terminator = match line_terminator(&self.lines[first]) {
                    "" => "\n",
                    t => t,
                };
                self.lines[first] = format!("{reference}{terminator}");
                for &i in duplicates.iter().rev() {
                    self.lines.remove(i);
                }
                debug!(%reference, removed = duplicates.len(), "Replaced existing requirement");
            }
            None => {
                let index = self.find_insertion_index(start, end);
                if index > 0 && line_terminator(&self.lines[index - 1]).is_empty() {
                    self.lines[index - 1].push('\n');
                }
                self.lines.insert(index, format!("{reference}\n"));
                debug!(%reference, index, "Inserted requirement");
            }
        }
    }

    /// Version of the first requirement on `name`, without `@user/channel`
    /// or `#revision` suffixes.
    pub fn required_version(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}/");
        self.lines.iter().find_map(|line| {
            let rest = line.trim().strip_prefix(&prefix)?;
            let version = rest.split(['@', '#']).next().unwrap_or(rest).trim();
            Some(version.to_string())
        })
    }
}

/// Adds `name/version` to the `conanfile.txt` of the workspace.
pub fn add_dependency_to_conanfile(workspace_dir: &Path, name: &str, version: &str) -> Result<()> {
    let path = workspace_dir.join(CONANFILE_NAME);
    let mut conanfile = Conanfile::load(&path)?;
    conanfile.add_requirement(name, version);
    conanfile.save(&path)?;
    info!(path = %path.display(), dependency = %format!("{name}/{version}"), "Updated conanfile");
    Ok(())
}

/// Version the workspace's `conanfile.txt` requires for `name`, if any.
pub fn required_version_in_workspace(workspace_dir: &Path, name: &str) -> Result<Option<String>> {
    let path = workspace_dir.join(CONANFILE_NAME);
    Ok(Conanfile::load(&path)?.required_version(name))
}

/// Directories listed on the `PATH=[...]` lines of the `conanbuildinfo.txt`
/// Conan writes into `build_dir` on `conan install`.
pub fn build_info_paths(build_dir: &Path) -> Result<Vec<String>> {
    let path = build_dir.join(BUILD_INFO_NAME);
    let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let mut paths = Vec::new();
    for line in text.lines() {
        if let Some(list) = line.strip_prefix("PATH=") {
            let entries: Vec<String> = serde_json::from_str(list.trim())?;
            paths.extend(entries);
        }
    }
    Ok(paths)
}
