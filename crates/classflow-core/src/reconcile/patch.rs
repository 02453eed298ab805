//! Stored patches and contextual application.
//!
//! A [`PatchRecord`] is the persisted, line-oriented diff between a
//! rendered baseline and the user's edited artifact. Application anchors
//! each hunk by its context lines and tolerates positional drift; a hunk
//! whose context no longer exists anywhere is reported as a conflict,
//! never dropped.

use std::fmt::Write as _;

use crate::error::{ClassflowError, ClassflowResult};
use crate::reconcile::diff::{diff_lines, join_lines, split_lines, Hunk, HunkLine};

/// Context lines kept around each hunk.
pub const DIFF_CONTEXT: usize = 3;

/// The diff of a single file within a composite artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Artifact-relative path (`main.nf`, `tests/main.nf.test`).
    pub path: String,
    pub hunks: Vec<Hunk>,
}

/// A stored, named diff covering every changed file of one composite
/// artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchRecord {
    pub files: Vec<FilePatch>,
}

impl PatchRecord {
    /// Diff `(baseline, edited)` pairs into a record, skipping files
    /// without changes.
    pub fn from_texts<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let mut files = Vec::new();
        for (path, baseline, edited) in pairs {
            let hunks = diff_lines(baseline, edited, DIFF_CONTEXT);
            if !hunks.is_empty() {
                files.push(FilePatch {
                    path: path.to_string(),
                    hunks,
                });
            }
        }
        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Render to unified-diff text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for file in &self.files {
            let _ = writeln!(out, "--- {}", file.path);
            let _ = writeln!(out, "+++ {}", file.path);
            for hunk in &file.hunks {
                let _ = write!(out, "{hunk}");
            }
        }
        out
    }

    /// Parse a stored patch file.
    pub fn parse(text: &str, source: &str) -> ClassflowResult<Self> {
        let invalid = |reason: &str, line_no: usize| ClassflowError::InvalidPatch {
            path: source.to_string(),
            reason: format!("{reason} (line {})", line_no + 1),
        };

        let mut files: Vec<FilePatch> = Vec::new();
        let mut lines = split_lines(text).into_iter().enumerate().peekable();
        while let Some((line_no, line)) = lines.next() {
            if line.is_empty() {
                continue;
            }
            let Some(old_path) = line.strip_prefix("--- ") else {
                return Err(invalid("expected '--- ' file header", line_no));
            };
            let Some((_, plus)) = lines.next() else {
                return Err(invalid("missing '+++ ' file header", line_no));
            };
            if !plus.starts_with("+++ ") {
                return Err(invalid("missing '+++ ' file header", line_no));
            }

            let mut hunks = Vec::new();
            while let Some((_, peeked)) = lines.peek() {
                if !peeked.starts_with("@@ ") {
                    break;
                }
                let (header_no, header) = lines.next().unwrap();
                let (old_start, old_count, new_start, new_count) =
                    parse_hunk_header(header).ok_or_else(|| invalid("malformed hunk header", header_no))?;

                let mut body = Vec::new();
                let (mut seen_old, mut seen_new) = (0usize, 0usize);
                while seen_old < old_count || seen_new < new_count {
                    let Some((body_no, body_line)) = lines.next() else {
                        return Err(invalid("truncated hunk", header_no));
                    };
                    match body_line.chars().next() {
                        Some(' ') => {
                            body.push(HunkLine::Context(body_line[1..].to_string()));
                            seen_old += 1;
                            seen_new += 1;
                        }
                        Some('-') => {
                            body.push(HunkLine::Removed(body_line[1..].to_string()));
                            seen_old += 1;
                        }
                        Some('+') => {
                            body.push(HunkLine::Added(body_line[1..].to_string()));
                            seen_new += 1;
                        }
                        // A blank line inside a hunk is an empty context line.
                        None => {
                            body.push(HunkLine::Context(String::new()));
                            seen_old += 1;
                            seen_new += 1;
                        }
                        _ => return Err(invalid("unexpected line in hunk", body_no)),
                    }
                }

                hunks.push(Hunk {
                    old_start,
                    old_count,
                    new_start,
                    new_count,
                    lines: body,
                });
            }

            if hunks.is_empty() {
                return Err(invalid("file section without hunks", line_no));
            }
            files.push(FilePatch {
                path: strip_diff_prefix(old_path).to_string(),
                hunks,
            });
        }

        Ok(Self { files })
    }

    /// Find the patch for an artifact-relative path.
    pub fn file(&self, path: &str) -> Option<&FilePatch> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// `a/x` and `b/x` prefixes from git-style diffs are tolerated.
fn strip_diff_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

fn parse_hunk_header(header: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = header.strip_prefix("@@ -")?;
    let (old_part, rest) = rest.split_once(" +")?;
    let (new_part, _) = rest.split_once(" @@")?;
    let parse_pair = |part: &str| -> Option<(usize, usize)> {
        match part.split_once(',') {
            Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
            None => Some((part.parse().ok()?, 1)),
        }
    };
    let (old_start, old_count) = parse_pair(old_part)?;
    let (new_start, new_count) = parse_pair(new_part)?;
    Some((old_start, old_count, new_start, new_count))
}

/// Result of applying hunks to one file.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub text: String,
    pub applied: usize,
    pub conflicts: Vec<Hunk>,
}

/// Apply hunks to a base text.
///
/// Each hunk is anchored at its recorded position adjusted by the drift
/// accumulated from earlier hunks, then searched outward line by line
/// until its context matches. Hunks that match nowhere are collected as
/// conflicts; the remaining hunks still apply.
pub fn apply_hunks(base: &str, hunks: &[Hunk]) -> ApplyOutcome {
    let mut lines: Vec<String> = split_lines(base).iter().map(|s| s.to_string()).collect();
    let mut applied = 0usize;
    let mut conflicts = Vec::new();
    let mut drift = 0isize;

    for hunk in hunks {
        let old_lines = hunk.old_lines();
        // A zero-count hunk inserts after `old_start`; otherwise
        // `old_start` is the 1-based first matched line.
        let expected = if hunk.old_count == 0 {
            hunk.old_start as isize + drift
        } else {
            hunk.old_start.saturating_sub(1) as isize + drift
        };

        match find_anchor(&lines, &old_lines, expected) {
            Some(pos) => {
                let new_lines: Vec<String> =
                    hunk.new_lines().iter().map(|s| s.to_string()).collect();
                lines.splice(pos..pos + old_lines.len(), new_lines);
                drift = drift + hunk.new_count as isize - hunk.old_count as isize
                    + (pos as isize - expected);
                applied += 1;
            }
            None => conflicts.push(hunk.clone()),
        }
    }

    ApplyOutcome {
        text: join_lines(&lines),
        applied,
        conflicts,
    }
}

/// Search for the position where `wanted` matches `lines`, starting at
/// `expected` and fanning outward.
fn find_anchor(lines: &[String], wanted: &[&str], expected: isize) -> Option<usize> {
    let len = lines.len() as isize;
    if wanted.is_empty() {
        // Pure insertion without context: anchor at the expected offset.
        return Some(expected.clamp(0, len) as usize);
    }

    let matches_at = |pos: isize| -> bool {
        pos >= 0
            && pos + wanted.len() as isize <= len
            && wanted
                .iter()
                .zip(&lines[pos as usize..])
                .all(|(w, l)| *w == l.as_str())
    };

    for offset in 0..=len {
        if matches_at(expected - offset) {
            return Some((expected - offset) as usize);
        }
        if offset > 0 && matches_at(expected + offset) {
            return Some((expected + offset) as usize);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "one\ntwo\nthree\nfour\nfive\nsix\nseven\n";

    #[test]
    fn test_apply_roundtrip() {
        let edited = "one\ntwo\nTHREE\nfour\nfive\nsix\nseven\nextra\n";
        let hunks = diff_lines(BASE, edited, DIFF_CONTEXT);
        let outcome = apply_hunks(BASE, &hunks);
        assert_eq!(outcome.text, edited);
        assert_eq!(outcome.applied, hunks.len());
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn test_apply_with_drift() {
        // The same edit applies after unrelated lines were inserted above.
        let edited = "one\ntwo\nthree\nfour\nfive\nSIX\nseven\n";
        let hunks = diff_lines(BASE, edited, 1);
        let shifted_base = "zero\nzero\nzero\none\ntwo\nthree\nfour\nfive\nsix\nseven\n";
        let outcome = apply_hunks(shifted_base, &hunks);
        assert!(outcome.conflicts.is_empty());
        assert!(outcome.text.contains("SIX"));
        assert!(outcome.text.starts_with("zero\n"));
    }

    #[test]
    fn test_conflict_when_context_gone() {
        let edited = "one\ntwo\nTHREE\nfour\nfive\nsix\nseven\n";
        let hunks = diff_lines(BASE, edited, 1);
        let rewritten = "alpha\nbeta\ngamma\n";
        let outcome = apply_hunks(rewritten, &hunks);
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.conflicts.len(), hunks.len());
        // The base is untouched when nothing applies.
        assert_eq!(outcome.text, rewritten);
    }

    #[test]
    fn test_record_render_parse_roundtrip() {
        let edited = "one\ntwo\nTHREE\nfour\nfive\nsix\nseven\n";
        let record = PatchRecord::from_texts([("main.nf", BASE, edited)]);
        assert_eq!(record.files.len(), 1);
        let rendered = record.render();
        let parsed = PatchRecord::parse(&rendered, "aligner.diff").unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_record_skips_unchanged_files() {
        let record = PatchRecord::from_texts([
            ("main.nf", BASE, BASE),
            ("meta.yml", "a\n", "b\n"),
        ]);
        assert_eq!(record.files.len(), 1);
        assert_eq!(record.files[0].path, "meta.yml");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = PatchRecord::parse("not a diff\n", "x.diff").unwrap_err();
        assert!(matches!(err, ClassflowError::InvalidPatch { .. }));
    }

    #[test]
    fn test_parse_git_style_prefixes() {
        let text = "--- a/main.nf\n+++ b/main.nf\n@@ -1,1 +1,1 @@\n-one\n+ONE\n";
        let record = PatchRecord::parse(text, "x.diff").unwrap();
        assert_eq!(record.files[0].path, "main.nf");
    }

    #[test]
    fn test_partial_application() {
        // Two independent edits; the second region is rewritten in the base.
        let edited = "ONE\ntwo\nthree\nfour\nfive\nsix\nSEVEN\n";
        let hunks = diff_lines(BASE, edited, 1);
        assert_eq!(hunks.len(), 2);
        let base2 = "one\ntwo\nthree\nfour\nfive\nchanged\nlines\n";
        let outcome = apply_hunks(base2, &hunks);
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.conflicts.len(), 1);
        assert!(outcome.text.starts_with("ONE\n"));
    }
}
