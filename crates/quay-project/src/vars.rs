//! Textual variable expansion for build settings

use crate::error::{ProjectError, Result};
use std::path::Path;

/// Expand `$VAR` references in `input`.
///
/// Recognized forms are `$$` (a literal `$`), `$PACKAGE_DIR` (the
/// declaring package's directory) and `$NAME` with `NAME` in
/// `[A-Za-z0-9_]+`, looked up in the process environment. A `$`
/// ending the input stays literal. When `is_path` is set, a relative
/// result is resolved against the package directory and returned as a
/// native path string.
pub fn expand_vars(input: &str, package_dir: &Path, is_path: bool) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];

        if after.is_empty() {
            out.push('$');
            rest = after;
            break;
        }
        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        let len = after
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .count();
        out.push_str(&lookup_variable(&after[..len], package_dir)?);
        rest = &after[len..];
    }
    out.push_str(rest);

    if is_path {
        let path = Path::new(&out);
        if path.is_absolute() {
            Ok(out)
        } else {
            Ok(package_dir.join(path).display().to_string())
        }
    } else {
        Ok(out)
    }
}

fn lookup_variable(name: &str, package_dir: &Path) -> Result<String> {
    if name == "PACKAGE_DIR" {
        return Ok(package_dir.display().to_string());
    }
    if name.is_empty() {
        return Err(ProjectError::UnknownVariable(String::new()));
    }
    std::env::var(name).map_err(|_| ProjectError::UnknownVariable(name.to_string()))
}

/// Identifier-safe form of a package name: every character outside
/// `[A-Za-z0-9_]` becomes an underscore.
pub fn sanitize_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dir() -> PathBuf {
        PathBuf::from("/p")
    }

    #[test]
    fn test_literal_input_unchanged() {
        assert_eq!(expand_vars("plain text", &dir(), false).unwrap(), "plain text");
        assert_eq!(expand_vars("", &dir(), false).unwrap(), "");
    }

    #[test]
    fn test_dollar_escape() {
        assert_eq!(expand_vars("$$", &dir(), false).unwrap(), "$");
        assert_eq!(expand_vars("a$$b", &dir(), false).unwrap(), "a$b");
        assert_eq!(expand_vars("$$$$", &dir(), false).unwrap(), "$$");
    }

    #[test]
    fn test_trailing_dollar_is_literal() {
        assert_eq!(expand_vars("end$", &dir(), false).unwrap(), "end$");
    }

    #[test]
    fn test_package_dir() {
        assert_eq!(
            expand_vars("$PACKAGE_DIR/src", &dir(), false).unwrap(),
            "/p/src"
        );
    }

    #[test]
    fn test_environment_variable() {
        std::env::set_var("QUAY_VARS_TEST_FOO", "bar");
        assert_eq!(
            expand_vars("x-$QUAY_VARS_TEST_FOO-y", &dir(), false).unwrap(),
            "x-bar-y"
        );
    }

    #[test]
    fn test_unknown_variable() {
        assert!(matches!(
            expand_vars("$QUAY_VARS_TEST_NOPE", &dir(), false),
            Err(ProjectError::UnknownVariable(name)) if name == "QUAY_VARS_TEST_NOPE"
        ));
    }

    #[test]
    fn test_empty_variable_name() {
        assert!(matches!(
            expand_vars("$-x", &dir(), false),
            Err(ProjectError::UnknownVariable(name)) if name.is_empty()
        ));
    }

    #[test]
    fn test_path_expansion() {
        std::env::set_var("QUAY_VARS_TEST_DIR", "bar");
        assert_eq!(
            expand_vars("$PACKAGE_DIR/src/$QUAY_VARS_TEST_DIR/$$literal", &dir(), true).unwrap(),
            "/p/src/bar/$literal"
        );
    }

    #[test]
    fn test_relative_path_resolved_against_package() {
        assert_eq!(expand_vars("src/gen", &dir(), true).unwrap(), "/p/src/gen");
    }

    #[test]
    fn test_absolute_path_kept() {
        assert_eq!(expand_vars("/abs/src", &dir(), true).unwrap(), "/abs/src");
    }

    #[test]
    fn test_sanitize_ident() {
        assert_eq!(sanitize_ident("my-pack:sub"), "my_pack_sub");
        assert_eq!(sanitize_ident("plain_1"), "plain_1");
    }
}
