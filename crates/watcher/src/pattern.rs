//! Readiness pattern sets — ordered regex matching, first match wins.
//!
//! A [`PatternSet`] is compiled once when a tailer is built. Compilation
//! fails fast: any invalid expression aborts construction with an error
//! naming the target and the offending pattern.

use regex::Regex;

use crate::error::WatchError;

/// Ordered set of compiled readiness patterns for one target.
///
/// Patterns are evaluated in order against each log line; the first match
/// wins. Matching is presence-only: no captures, no scoring.
#[derive(Debug)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compiles a pattern set from the optional primary pattern and the
    /// auxiliary list. The primary, if present, is appended after the
    /// auxiliary patterns to form one ordered sequence.
    ///
    /// # Errors
    ///
    /// - [`WatchError::NoPatterns`] when the combined sequence is empty
    /// - [`WatchError::PatternInvalid`] on the first expression that fails
    ///   to compile
    pub fn compile(
        target: &str,
        primary: Option<&str>,
        auxiliary: &[String],
    ) -> Result<Self, WatchError> {
        let mut raw: Vec<&str> = auxiliary.iter().map(String::as_str).collect();
        if let Some(primary) = primary {
            raw.push(primary);
        }

        if raw.is_empty() {
            return Err(WatchError::NoPatterns {
                target: target.to_owned(),
            });
        }

        let mut patterns = Vec::with_capacity(raw.len());
        for expr in raw {
            let regex = Regex::new(expr).map_err(|e| WatchError::PatternInvalid {
                target: target.to_owned(),
                pattern: expr.to_owned(),
                reason: e.to_string(),
            })?;
            patterns.push(regex);
        }

        Ok(Self { patterns })
    }

    /// Evaluates the sequence in order against a line.
    ///
    /// Returns the index of the first matching pattern, or `None`.
    pub fn first_match(&self, line: &str) -> Option<usize> {
        self.patterns.iter().position(|p| p.is_match(line))
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// A compiled set is never empty.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Source text of the pattern at `idx`, for logging which pattern was
    /// credited with a match.
    pub fn source(&self, idx: usize) -> Option<&str> {
        self.patterns.get(idx).map(Regex::as_str)
    }
}
