//! Minimal `.env` file editing
//!
//! Reads and replaces `KEY=VALUE` lines while leaving comments and every other
//! line untouched. Values are written verbatim, with no quoting or escaping.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    line.split_once('=').map(|(k, v)| (k.trim(), v.trim()))
}

/// Value of `key` in the env file, if the file and the key exist
pub fn get_env_var(path: &Path, key: &str) -> io::Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(parse_line)
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string()))
}

/// Set or replace `key=value`; returns whether the file changed
///
/// Every existing line for `key` is rewritten. A missing key is appended,
/// separated from non-blank content by one empty line. The file is only
/// written when its content would change.
pub fn set_env_var(path: &Path, key: &str, value: &str) -> io::Result<bool> {
    debug!(?path, %key, "set_env_var: called");
    let mut lines: Vec<String> = if path.exists() {
        fs::read_to_string(path)?.lines().map(str::to_string).collect()
    } else {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Vec::new()
    };

    let entry = format!("{}={}", key, value);
    let mut changed = false;
    let mut found = false;
    for line in lines.iter_mut() {
        if parse_line(line).is_some_and(|(k, _)| k == key) {
            found = true;
            if *line != entry {
                *line = entry.clone();
                changed = true;
            }
        }
    }

    if !found {
        if lines.last().is_some_and(|l| !l.trim().is_empty()) {
            lines.push(String::new());
        }
        lines.push(entry);
        changed = true;
    }

    if changed {
        fs::write(path, lines.join("\n") + "\n")?;
    }
    Ok(changed)
}
