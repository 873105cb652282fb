use similar::{ChangeTag, TextDiff};

/// Returned instead of an empty diff when both sides are byte-identical.
pub const NO_CHANGES_MESSAGE: &str = "No changes were made between this two files.";

const ORIGINAL_LABEL: &str = "Original";
const CURRENT_LABEL: &str = "Current";

/// Line-based unified diff between two revision bodies. `current` is the
/// new side and `original` the baseline; the `Original`/`Current` labels
/// are user-visible and must keep that assignment. Lines carry no
/// terminators and are joined with single newlines.
pub fn unified_changes(current: &str, original: &str) -> String {
    if current == original {
        return NO_CHANGES_MESSAGE.to_string();
    }

    let diff = TextDiff::from_lines(original, current);
    let mut lines = vec![
        format!("--- {ORIGINAL_LABEL}"),
        format!("+++ {CURRENT_LABEL}"),
    ];
    for hunk in diff.unified_diff().iter_hunks() {
        lines.push(hunk.header().to_string());
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => '-',
                ChangeTag::Insert => '+',
                ChangeTag::Equal => ' ',
            };
            lines.push(format!("{sign}{}", change.value().trim_end_matches('\n')));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{NO_CHANGES_MESSAGE, unified_changes};

    #[test]
    fn identical_content_yields_the_sentinel() {
        assert_eq!(unified_changes("same\n", "same\n"), NO_CHANGES_MESSAGE);
        assert_eq!(unified_changes("", ""), NO_CHANGES_MESSAGE);
    }

    #[test]
    fn labels_keep_their_sides() {
        let text = unified_changes("new line\n", "old line\n");
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "--- Original");
        assert_eq!(lines[1], "+++ Current");
        assert!(lines.contains(&"-old line"));
        assert!(lines.contains(&"+new line"));
    }

    #[test]
    fn output_has_no_trailing_terminators() {
        let text = unified_changes("a\nb\nc\n", "a\nx\nc\n");
        assert!(!text.ends_with('\n'));
        assert!(text.lines().all(|line| !line.ends_with('\r')));
        assert!(text.lines().any(|line| line.starts_with("@@")));
    }

    #[test]
    fn unchanged_context_lines_are_prefixed_with_a_space() {
        let text = unified_changes("keep\nnew\n", "keep\nold\n");
        assert!(text.lines().any(|line| line == " keep"));
    }
}
