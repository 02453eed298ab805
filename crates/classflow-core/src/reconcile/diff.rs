//! Line-oriented diff between a rendered baseline and an edited artifact.
//!
//! Produces contextual hunks in unified format. Artifacts are small
//! (hundreds of lines), so a full LCS table is used rather than a
//! divide-and-conquer diff.

use std::fmt;

/// One line of a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String),
    Removed(String),
    Added(String),
}

/// One contiguous region of change, anchored by context lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based first line of the hunk in the old text (0 when the old
    /// side is empty).
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// Lines this hunk expects to find in the text it applies to.
    pub fn old_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Removed(s) => Some(s.as_str()),
                HunkLine::Added(_) => None,
            })
            .collect()
    }

    /// Lines this hunk produces.
    pub fn new_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Added(s) => Some(s.as_str()),
                HunkLine::Removed(_) => None,
            })
            .collect()
    }

    /// Header in unified format.
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header())?;
        for line in &self.lines {
            match line {
                HunkLine::Context(s) => writeln!(f, " {s}")?,
                HunkLine::Removed(s) => writeln!(f, "-{s}")?,
                HunkLine::Added(s) => writeln!(f, "+{s}")?,
            }
        }
        Ok(())
    }
}

/// Split text into lines without a trailing phantom element.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

/// Join lines back into text with a trailing newline.
pub fn join_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Removed(usize),
    Added(usize),
}

/// Compute the edit script between two line slices via LCS.
fn edit_ops(old: &[&str], new: &[&str]) -> Vec<Op> {
    let n = old.len();
    let m = new.len();
    // dp[i][j] = LCS length of old[i..] and new[j..]
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if old[i] == new[j] {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] && dp[i][j] == dp[i + 1][j + 1] + 1 {
            ops.push(Op::Equal(i, j));
            i += 1;
            j += 1;
        } else if dp[i + 1][j] >= dp[i][j + 1] {
            ops.push(Op::Removed(i));
            i += 1;
        } else {
            ops.push(Op::Added(j));
            j += 1;
        }
    }
    while i < n {
        ops.push(Op::Removed(i));
        i += 1;
    }
    while j < m {
        ops.push(Op::Added(j));
        j += 1;
    }
    ops
}

/// Diff two texts into contextual hunks.
///
/// Hunks closer than `2 * context` equal lines are merged so that their
/// context regions never overlap.
pub fn diff_lines(old_text: &str, new_text: &str, context: usize) -> Vec<Hunk> {
    let old = split_lines(old_text);
    let new = split_lines(new_text);
    let ops = edit_ops(&old, &new);

    // Indices of ops that change something.
    let changes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Equal(_, _)))
        .map(|(i, _)| i)
        .collect();
    if changes.is_empty() {
        return Vec::new();
    }

    // Group changes whose separating equal run fits inside merged context.
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let (mut start, mut prev) = (changes[0], changes[0]);
    for &c in &changes[1..] {
        if c - prev - 1 <= 2 * context {
            prev = c;
        } else {
            groups.push((start, prev));
            start = c;
            prev = c;
        }
    }
    groups.push((start, prev));

    let mut hunks = Vec::with_capacity(groups.len());
    for (first, last) in groups {
        let lo = first.saturating_sub(context);
        let hi = (last + context + 1).min(ops.len());

        let mut lines = Vec::with_capacity(hi - lo);
        let mut old_start = None;
        let mut new_start = None;
        let (mut old_count, mut new_count) = (0usize, 0usize);
        for op in &ops[lo..hi] {
            match op {
                Op::Equal(i, j) => {
                    old_start.get_or_insert(*i + 1);
                    new_start.get_or_insert(*j + 1);
                    lines.push(HunkLine::Context(old[*i].to_string()));
                    old_count += 1;
                    new_count += 1;
                }
                Op::Removed(i) => {
                    old_start.get_or_insert(*i + 1);
                    lines.push(HunkLine::Removed(old[*i].to_string()));
                    old_count += 1;
                }
                Op::Added(j) => {
                    new_start.get_or_insert(*j + 1);
                    lines.push(HunkLine::Added(new[*j].to_string()));
                    new_count += 1;
                }
            }
        }

        // Pure insertions anchor to the preceding old line.
        let old_start = old_start.unwrap_or_else(|| {
            ops[..lo]
                .iter()
                .filter(|op| matches!(op, Op::Equal(_, _) | Op::Removed(_)))
                .count()
        });
        let new_start = new_start.unwrap_or_else(|| {
            ops[..lo]
                .iter()
                .filter(|op| matches!(op, Op::Equal(_, _) | Op::Added(_)))
                .count()
        });

        hunks.push(Hunk {
            old_start,
            old_count,
            new_start,
            new_count,
            lines,
        });
    }
    hunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_have_no_hunks() {
        let text = "a\nb\nc\n";
        assert!(diff_lines(text, text, 3).is_empty());
    }

    #[test]
    fn test_single_change() {
        let old = "a\nb\nc\nd\ne\n";
        let new = "a\nb\nX\nd\ne\n";
        let hunks = diff_lines(old, new, 1);
        assert_eq!(hunks.len(), 1);
        let hunk = &hunks[0];
        assert_eq!(hunk.old_start, 2);
        assert_eq!(hunk.old_count, 3);
        assert_eq!(hunk.new_count, 3);
        assert_eq!(
            hunk.lines,
            vec![
                HunkLine::Context("b".into()),
                HunkLine::Removed("c".into()),
                HunkLine::Added("X".into()),
                HunkLine::Context("d".into()),
            ]
        );
    }

    #[test]
    fn test_distant_changes_make_separate_hunks() {
        let old = "a\nb\nc\nd\ne\nf\ng\nh\ni\nj\n";
        let new = "A\nb\nc\nd\ne\nf\ng\nh\ni\nJ\n";
        let hunks = diff_lines(old, new, 1);
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].old_start, 1);
        assert_eq!(hunks[1].header(), "@@ -9,2 +9,2 @@");
    }

    #[test]
    fn test_nearby_changes_merge() {
        let old = "a\nb\nc\nd\ne\n";
        let new = "A\nb\nc\nd\nE\n";
        let hunks = diff_lines(old, new, 3);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].old_count, 5);
    }

    #[test]
    fn test_append_at_end() {
        let old = "a\nb\n";
        let new = "a\nb\nc\nd\n";
        let hunks = diff_lines(old, new, 3);
        assert_eq!(hunks.len(), 1);
        let hunk = &hunks[0];
        assert_eq!(hunk.old_count, 2);
        assert_eq!(hunk.new_count, 4);
        assert_eq!(hunk.new_lines(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_display_roundtrip_shape() {
        let old = "a\nb\nc\n";
        let new = "a\nB\nc\n";
        let hunks = diff_lines(old, new, 1);
        let rendered = hunks[0].to_string();
        assert!(rendered.starts_with("@@ -1,3 +1,3 @@\n"));
        assert!(rendered.contains("\n-b\n"));
        assert!(rendered.contains("\n+B\n"));
    }

    #[test]
    fn test_empty_old_text() {
        let hunks = diff_lines("", "a\nb\n", 3);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].old_count, 0);
        assert_eq!(hunks[0].new_count, 2);
    }
}
