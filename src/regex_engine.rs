//! Compile-once/match-many regex wrapper with fast paths.
//!
//! Filter/rewrite operations need specialized matchers that avoid invoking
//! the full regex engine for a handful of cheap-to-detect shapes:
//! `^literal`, `literal$`, `^literal$`, and plain containment.
//! `regex::Regex` is already compiled once and reused (that's this
//! module's whole design), so the wrapper's job is purely the bounds
//! checks and the fast-path classification on top of it.

use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};

/// Pattern length bound.
pub const MAX_PATTERN_LEN: usize = 512;
/// Replacement length bound.
pub const MAX_REPLACEMENT_LEN: usize = 1024;

/// Compile-time regex options, mirroring the knobs `regex::RegexBuilder`
/// exposes. `optimize` controls whether `compile` attempts the fast-path
/// classification below; turning it off always falls through to the full
/// regex engine, useful when a caller suspects the classifier is wrong for
/// their pattern.
#[derive(Debug, Clone, Copy)]
pub struct CompileFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_all: bool,
    pub optimize: bool,
}

impl Default for CompileFlags {
    fn default() -> Self {
        CompileFlags {
            case_insensitive: false,
            multi_line: false,
            dot_all: false,
            optimize: true,
        }
    }
}

/// Which fast-path shape a pattern was classified as.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FastPath {
    StartsWith(String),
    EndsWith(String),
    ExactMatch(String),
    Contains(String),
    Custom,
}

/// A compiled pattern, optionally classified into a fast path.
#[derive(Debug)]
pub struct CompiledPattern {
    regex: Regex,
    fast_path: FastPath,
}

impl CompiledPattern {
    /// Compiles `pattern` with the default flags (case-sensitive,
    /// single-line, fast-path classification enabled).
    pub fn compile(pattern: &str) -> Result<Self> {
        Self::compile_with_flags(pattern, CompileFlags::default())
    }

    /// Compiles `pattern`, rejecting it up front if it violates the length
    /// bounds or contains an embedded NUL, without ever invoking the regex
    /// compiler for a pattern that is already known to be invalid. The
    /// fast-path classification only runs when `flags.optimize` is set,
    /// and only case-sensitive literal shapes are eligible for it; a
    /// pattern compiled with `case_insensitive`, `multi_line`, or
    /// `dot_all` always falls through to the full regex engine, since
    /// those flags change what a literal substring match would mean.
    pub fn compile_with_flags(pattern: &str, flags: CompileFlags) -> Result<Self> {
        if pattern.len() > MAX_PATTERN_LEN {
            return Err(Error::invalid_pattern(format!(
                "pattern length {} exceeds {MAX_PATTERN_LEN}",
                pattern.len()
            )));
        }
        if pattern.contains('\0') {
            return Err(Error::invalid_pattern("pattern contains an embedded NUL"));
        }
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_all)
            .build()
            .map_err(|e| Error::invalid_pattern(format!("{pattern}: {e}")))?;

        let plain_flags = !flags.case_insensitive && !flags.multi_line && !flags.dot_all;
        let fast_path = if flags.optimize && plain_flags {
            classify(pattern)
        } else {
            FastPath::Custom
        };
        Ok(CompiledPattern { regex, fast_path })
    }

    /// Does `text` match anywhere? Uses the fast path when available.
    pub fn test(&self, text: &str) -> bool {
        match &self.fast_path {
            FastPath::StartsWith(lit) => text.starts_with(lit.as_str()),
            FastPath::EndsWith(lit) => text.ends_with(lit.as_str()),
            FastPath::ExactMatch(lit) => text == lit.as_str(),
            FastPath::Contains(lit) => text.contains(lit.as_str()),
            FastPath::Custom => self.regex.is_match(text),
        }
    }

    /// Replaces every non-overlapping match of the pattern in `text` with
    /// `replacement`, returning the new string and the number of
    /// replacements made. `replacement` is checked against
    /// `MAX_REPLACEMENT_LEN` up front so a caller never pays for an
    /// oversized replacement that would be rejected anyway.
    pub fn replace_all(&self, text: &str, replacement: &str) -> Result<(String, usize)> {
        if replacement.len() > MAX_REPLACEMENT_LEN {
            return Err(Error::invalid_pattern(format!(
                "replacement length {} exceeds {MAX_REPLACEMENT_LEN}",
                replacement.len()
            )));
        }
        let count = self.regex.find_iter(text).count();
        if count == 0 {
            return Ok((text.to_owned(), 0));
        }
        let replaced = self.regex.replace_all(text, replacement).into_owned();
        Ok((replaced, count))
    }
}

/// Cheap, purely syntactic classification of a pattern into one of the
/// fast-path shapes. Anything with regex metacharacters beyond a leading
/// `^`/trailing `$` falls through to `Custom`.
fn classify(pattern: &str) -> FastPath {
    let has_caret = pattern.starts_with('^');
    let has_dollar = pattern.ends_with('$') && !pattern.ends_with("\\$");
    let inner_start = if has_caret { 1 } else { 0 };
    let inner_end = if has_dollar {
        pattern.len() - 1
    } else {
        pattern.len()
    };
    if inner_start > inner_end {
        return FastPath::Custom;
    }
    let inner = &pattern[inner_start..inner_end];
    if inner.is_empty() || contains_meta(inner) {
        if !has_caret && !has_dollar && !pattern.is_empty() && !contains_meta(pattern) {
            return FastPath::Contains(pattern.to_owned());
        }
        return FastPath::Custom;
    }
    match (has_caret, has_dollar) {
        (true, true) => FastPath::ExactMatch(inner.to_owned()),
        (true, false) => FastPath::StartsWith(inner.to_owned()),
        (false, true) => FastPath::EndsWith(inner.to_owned()),
        (false, false) => FastPath::Contains(inner.to_owned()),
    }
}

fn contains_meta(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(
            c,
            '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' | '^' | '$'
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_pattern() {
        let pattern = "a".repeat(MAX_PATTERN_LEN + 1);
        let err = CompiledPattern::compile(&pattern).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn rejects_embedded_nul() {
        let err = CompiledPattern::compile("a\0b").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn rejects_oversized_replacement() {
        let c = CompiledPattern::compile("abc").unwrap();
        let replacement = "x".repeat(MAX_REPLACEMENT_LEN + 1);
        let err = c.replace_all("abcabc", &replacement).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn classifies_anchored_patterns() {
        assert_eq!(classify("^foo"), FastPath::StartsWith("foo".into()));
        assert_eq!(classify("foo$"), FastPath::EndsWith("foo".into()));
        assert_eq!(classify("^foo$"), FastPath::ExactMatch("foo".into()));
        assert_eq!(classify("foo"), FastPath::Contains("foo".into()));
        assert_eq!(classify("^old_.*$"), FastPath::Custom);
    }

    #[test]
    fn fast_path_and_regex_agree() {
        let c = CompiledPattern::compile("^old_.*$").unwrap();
        assert!(c.test("old_active"));
        assert!(!c.test("new_active"));
        let (out, n) = c.replace_all("old_active", "new_value").unwrap();
        assert_eq!(out, "new_value");
        assert_eq!(n, 1);
    }

    #[test]
    fn contains_fast_path_matches_substrings() {
        let c = CompiledPattern::compile("mid").unwrap();
        assert!(c.test("amidst"));
        assert!(!c.test("nope"));
    }

    #[test]
    fn case_insensitive_flag_matches_regardless_of_case() {
        let flags = CompileFlags {
            case_insensitive: true,
            ..CompileFlags::default()
        };
        let c = CompiledPattern::compile_with_flags("^old_", flags).unwrap();
        assert!(c.test("OLD_active"));
    }

    #[test]
    fn non_default_flags_bypass_the_fast_path() {
        let flags = CompileFlags {
            multi_line: true,
            ..CompileFlags::default()
        };
        let c = CompiledPattern::compile_with_flags("^foo", flags).unwrap();
        assert_eq!(c.fast_path, FastPath::Custom);
    }

    #[test]
    fn optimize_false_always_uses_the_full_engine() {
        let flags = CompileFlags {
            optimize: false,
            ..CompileFlags::default()
        };
        let c = CompiledPattern::compile_with_flags("foo", flags).unwrap();
        assert_eq!(c.fast_path, FastPath::Custom);
        assert!(c.test("a foo b"));
    }
}
