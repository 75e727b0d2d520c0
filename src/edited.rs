//! Line numbers edited between two versions of a document.

use crate::document::TextDocument;
use similar::{Algorithm, DiffTag, capture_diff_slices};
use std::collections::BTreeSet;

/// 1-based numbers of the lines in `target` which were added or changed
/// compared to `original`, each widened by `context_lines` neighbours on both
/// sides.
///
/// Deleted lines leave no trace in `target`, so pure deletions contribute
/// nothing. The result is sorted and free of duplicates.
///
/// ```
/// use edited_lines::{TextDocument, edited_linenums};
///
/// let original = TextDocument::from_lines(["1", "2", "3", "4", "5"]);
/// let target = TextDocument::from_lines(["1", "2", "three", "4", "5"]);
/// assert_eq!(edited_linenums(&original, &target, 0), [3]);
/// assert_eq!(edited_linenums(&original, &target, 1), [2, 3, 4]);
/// ```
#[must_use]
pub fn edited_linenums(
    original: &TextDocument,
    target: &TextDocument,
    context_lines: usize,
) -> Vec<usize> {
    let Some(last) = target.lines().len().checked_sub(1) else {
        return Vec::new();
    };

    let changed = capture_diff_slices(Algorithm::Myers, original.lines(), target.lines())
        .into_iter()
        .filter(|op| op.tag() != DiffTag::Equal)
        .flat_map(|op| op.new_range());

    let mut linenums = BTreeSet::new();
    for index in changed {
        let start = index.saturating_sub(context_lines);
        let end = index.saturating_add(context_lines).min(last);
        linenums.extend((start..=end).map(|i| i + 1));
    }
    linenums.into_iter().collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Short documents over a tiny alphabet so diffs have plenty of equal runs
    fn arb_document() -> impl Strategy<Value = TextDocument> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d"]), 0..30)
            .prop_map(TextDocument::from_lines)
    }

    proptest! {
        /// Output is strictly increasing and within the target document
        #[test]
        fn sorted_unique_and_in_bounds(
            original in arb_document(),
            target in arb_document(),
            context in 0..5usize,
        ) {
            let linenums = edited_linenums(&original, &target, context);
            prop_assert!(linenums.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(linenums.iter().all(|&n| n >= 1 && n <= target.lines().len()));
        }

        /// More context never loses a line
        #[test]
        fn more_context_is_superset(
            original in arb_document(),
            target in arb_document(),
            context in 0..5usize,
            extra in 1..5usize,
        ) {
            let narrow = edited_linenums(&original, &target, context);
            let wide = edited_linenums(&original, &target, context + extra);
            prop_assert!(narrow.iter().all(|n| wide.contains(n)));
        }

        /// A document compared with itself has no edited lines
        #[test]
        fn identical_documents(document in arb_document(), context in 0..5usize) {
            prop_assert!(edited_linenums(&document, &document, context).is_empty());
        }

        /// Lines outside the edited set are unchanged copies of original lines
        #[test]
        fn untouched_lines_come_from_original(
            original in arb_document(),
            target in arb_document(),
        ) {
            let edited = edited_linenums(&original, &target, 0);
            let kept: Vec<&String> = target
                .lines()
                .iter()
                .enumerate()
                .filter(|(i, _)| !edited.contains(&(i + 1)))
                .map(|(_, line)| line)
                .collect();
            // Unedited target lines form a subsequence of the original
            let mut remaining = original.lines().iter();
            prop_assert!(kept.iter().all(|line| remaining.any(|o| o == *line)));
        }
    }
}
