//! Template parsing and substitution for configuration values.
//!
//! Project paths, test parameters and dependency paths may reference values
//! that are only known per iteration: the compiler's variables, the build id,
//! the platform, the dependency version, and so on. This module parses those
//! templates and substitutes values from a flat string map in a single pass.
//!
//! # Template Format
//!
//! - `{key}` - replaced by the value of `key`
//! - `{{` and `}}` - literal `{` and `}`
//!
//! A lone `}` passes through unchanged. Substituted values are never
//! re-scanned, so a value containing `{x}` stays as written.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use matrixbuild_lib::placeholder::{parse, substitute, Segment};
//!
//! let segments = parse("Source/{edition}/Core.dproj").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("Source/".to_string()),
//!     Segment::Variable("edition".to_string()),
//!     Segment::Literal("/Core.dproj".to_string()),
//! ]);
//!
//! let vars = BTreeMap::from([("edition".to_string(), "D12".to_string())]);
//! assert_eq!(substitute("Source/{edition}/Core.dproj", &vars).unwrap(), "Source/D12/Core.dproj");
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::OrderedMap;

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A `{key}` reference to be looked up
  Variable(String),
}

/// Errors that can occur during template parsing or substitution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("empty placeholder at position {0}")]
  EmptyName(usize),

  #[error("missing variable '{0}'")]
  MissingVariable(String),
}

/// A flat lookup table of substitution values.
pub trait Variables {
  fn lookup(&self, name: &str) -> Option<&str>;
}

impl Variables for BTreeMap<String, String> {
  fn lookup(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

impl Variables for OrderedMap<String> {
  fn lookup(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

/// Parse a template into literal and variable segments.
///
/// # Errors
///
/// Returns an error if a `{` is never closed or encloses nothing.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    match ch {
      '{' => {
        if let Some((_, '{')) = chars.peek() {
          // Escaped: {{ -> {
          chars.next();
          literal.push('{');
          continue;
        }

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut name = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          name.push(c);
        }

        if !found_close {
          return Err(PlaceholderError::Unclosed(pos));
        }
        if name.is_empty() {
          return Err(PlaceholderError::EmptyName(pos));
        }
        segments.push(Segment::Variable(name));
      }
      '}' => {
        // Both }} and a lone } produce a single literal brace
        if let Some((_, '}')) = chars.peek() {
          chars.next();
        }
        literal.push('}');
      }
      _ => literal.push(ch),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Substitute every `{key}` in `input` from `vars`.
///
/// # Errors
///
/// Returns [`PlaceholderError::MissingVariable`] naming the first key that
/// `vars` does not define, or a parse error for malformed templates.
pub fn substitute(input: &str, vars: &impl Variables) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, vars)
}

/// Substitute variables in pre-parsed segments.
///
/// Use this when the same template is expanded against several contexts,
/// such as one test parameter across a dependency-version matrix.
pub fn substitute_segments(segments: &[Segment], vars: &impl Variables) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Variable(name) => {
        let value = vars
          .lookup(name)
          .ok_or_else(|| PlaceholderError::MissingVariable(name.clone()))?;
        result.push_str(value);
      }
    }
  }

  Ok(result)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  // ==========================================================================
  // Realistic Scenario Tests
  // ==========================================================================

  #[test]
  fn project_path_from_compiler_variables() {
    let compiler_vars = vars(&[("edition", "D12")]);
    let result = substitute("Packages\\{edition}\\Ossl4Pas.dproj", &compiler_vars).unwrap();
    assert_eq!(result, "Packages\\D12\\Ossl4Pas.dproj");
  }

  #[test]
  fn test_report_path_uses_run_context() {
    let ctx = vars(&[
      ("output_dir", "/build/20260101_120000_main_AB12/DCC/Win64/Debug"),
      ("project_name", "CoreTest_3.3"),
    ]);
    let result = substitute("{output_dir}/reports/{project_name}.xml", &ctx).unwrap();
    assert_eq!(
      result,
      "/build/20260101_120000_main_AB12/DCC/Win64/Debug/reports/CoreTest_3.3.xml"
    );
  }

  #[test]
  fn dependency_path_per_version() {
    let ctx = vars(&[("version", "3.0"), ("platform", "Win32")]);
    let segments = parse("lib/openssl/{version}/{platform}").unwrap();
    assert_eq!(substitute_segments(&segments, &ctx).unwrap(), "lib/openssl/3.0/Win32");

    let ctx = vars(&[("version", "3.3"), ("platform", "Win32")]);
    assert_eq!(substitute_segments(&segments, &ctx).unwrap(), "lib/openssl/3.3/Win32");
  }

  #[test]
  fn toolchain_macros_pass_through() {
    // $(Var) and %VAR% belong to the toolchain and are not templates
    let result = substitute("$(BDS)\\lib;%OPENSSL_ROOT%", &vars(&[])).unwrap();
    assert_eq!(result, "$(BDS)\\lib;%OPENSSL_ROOT%");
  }

  #[test]
  fn substituted_values_are_not_rescanned() {
    let ctx = vars(&[("a", "{b}"), ("b", "nope")]);
    assert_eq!(substitute("{a}", &ctx).unwrap(), "{b}");
  }

  // ==========================================================================
  // Error Cases
  // ==========================================================================

  #[test]
  fn error_missing_variable_names_the_key() {
    let result = substitute("Source/{edition}/Core.dproj", &vars(&[]));
    assert_eq!(result, Err(PlaceholderError::MissingVariable("edition".to_string())));
  }

  #[test]
  fn error_unclosed_placeholder() {
    let result = parse("out/{output_dir");
    assert_eq!(result, Err(PlaceholderError::Unclosed(4)));
  }

  #[test]
  fn error_empty_placeholder() {
    let result = parse("x{}y");
    assert_eq!(result, Err(PlaceholderError::EmptyName(1)));
  }

  // ==========================================================================
  // Edge Cases
  // ==========================================================================

  #[test]
  fn escaped_braces_are_literal() {
    let result = substitute("{{not_a_var}} {v}", &vars(&[("v", "1")])).unwrap();
    assert_eq!(result, "{not_a_var} 1");
  }

  #[test]
  fn lone_closing_brace_is_literal() {
    assert_eq!(substitute("a}b", &vars(&[])).unwrap(), "a}b");
  }

  #[test]
  fn adjacent_variables_no_separator() {
    let ctx = vars(&[("name", "Core"), ("version", "_3.0")]);
    assert_eq!(substitute("{name}{version}", &ctx).unwrap(), "Core_3.0");
  }

  #[test]
  fn empty_input() {
    assert!(parse("").unwrap().is_empty());
  }

  #[test]
  fn ordered_map_lookup() {
    let mut map = OrderedMap::new();
    map.insert("edition".to_string(), "D11".to_string());
    assert_eq!(substitute("{edition}", &map).unwrap(), "D11");
  }
}
