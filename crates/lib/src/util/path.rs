//! Lexical path helpers.
//!
//! Configuration values are written by hand and often mix `/` and `\`, so
//! both are accepted as separators regardless of the host. Nothing here
//! touches the filesystem.

use std::path::{MAIN_SEPARATOR, Path};

fn is_separator(c: char) -> bool {
  c == '/' || c == '\\'
}

/// Returns true if the value contains a directory separator of either style.
pub fn is_path_shaped(value: &str) -> bool {
  value.contains(is_separator)
}

/// Returns true if the value is an absolute path on this host.
pub fn is_absolute(value: &str) -> bool {
  Path::new(value).is_absolute()
}

/// Split a leading drive designator such as `C:` off the path.
fn split_drive(path: &str) -> (&str, &str) {
  let bytes = path.as_bytes();
  if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
    path.split_at(2)
  } else {
    ("", path)
  }
}

/// Normalize a path without consulting the filesystem.
///
/// Both separator styles are rewritten to the host separator, repeated
/// separators and `.` components are dropped, and `..` consumes the
/// preceding component. A leading root or drive prefix is preserved; `..`
/// never climbs above a root. An empty result becomes `.`.
pub fn normalize(input: &str) -> String {
  let unified: String = input
    .chars()
    .map(|c| if is_separator(c) { MAIN_SEPARATOR } else { c })
    .collect();
  let (drive, rest) = split_drive(&unified);
  let rooted = rest.starts_with(MAIN_SEPARATOR);

  let mut parts: Vec<&str> = Vec::new();
  for part in rest.split(MAIN_SEPARATOR) {
    match part {
      "" | "." => {}
      ".." => {
        if parts.last().is_some_and(|p| *p != "..") {
          parts.pop();
        } else if !rooted {
          parts.push("..");
        }
      }
      other => parts.push(other),
    }
  }

  let mut out = String::from(drive);
  if rooted {
    out.push(MAIN_SEPARATOR);
  }
  out.push_str(&parts.join(&MAIN_SEPARATOR.to_string()));
  if out.is_empty() {
    out.push('.');
  }
  out
}

/// Make `value` absolute against `base` and normalize it.
///
/// Already absolute values are only normalized.
pub fn absolutize(value: &str, base: &Path) -> String {
  if is_absolute(value) {
    normalize(value)
  } else {
    normalize(&base.join(value).to_string_lossy())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn path_shape_detects_either_separator() {
    assert!(is_path_shaped("lib/openssl"));
    assert!(is_path_shaped("lib\\openssl"));
    assert!(!is_path_shaped("3.0"));
    assert!(!is_path_shaped(""));
  }

  #[test]
  #[cfg(unix)]
  fn normalize_collapses_dots_and_separators() {
    assert_eq!(normalize("a//b/./c/../d"), "a/b/d");
    assert_eq!(normalize("..\\lib\\openssl\\3.0"), "../lib/openssl/3.0");
    assert_eq!(normalize("/a/../../b"), "/b");
    assert_eq!(normalize("a/.."), ".");
    assert_eq!(normalize(""), ".");
    assert_eq!(normalize("./"), ".");
  }

  #[test]
  #[cfg(unix)]
  fn normalize_keeps_leading_parent_refs_on_relative_paths() {
    assert_eq!(normalize("../../x/../y"), "../../y");
  }

  #[test]
  #[cfg(unix)]
  fn normalize_preserves_drive_prefix() {
    assert_eq!(normalize("C:\\Tools\\..\\Embarcadero\\bin"), "C:/Embarcadero/bin");
  }

  #[test]
  #[cfg(unix)]
  fn absolutize_joins_relative_to_base() {
    let base = Path::new("/repo");
    assert_eq!(absolutize("lib/../out", base), "/repo/out");
    assert_eq!(absolutize("/opt/ssl", base), "/opt/ssl");
  }

  #[test]
  fn plain_values_survive_normalization() {
    assert_eq!(normalize("release"), "release");
  }
}
