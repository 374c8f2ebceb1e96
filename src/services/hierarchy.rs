//! Rebuilds the reply forest of a post from its flat comment rows.

use std::collections::{HashMap, HashSet};

use crate::models::comment::{Comment, CommentNode};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("comment {comment_id} replies to comment {parent_id}, which is not in the set")]
    MissingParent { comment_id: i64, parent_id: i64 },
}

/// Builds the comment forest for one post.
///
/// Roots keep the order in which they appear in `comments`, and so do the replies
/// under each parent. Nothing is re-sorted. Duplicate rows are folded so every
/// comment shows up exactly once.
///
/// The input must be self-contained: a `parent_id` that points outside the set
/// is an error.
pub fn build_hierarchy(comments: &[Comment]) -> Result<Vec<CommentNode>, HierarchyError> {
    // Arena of nodes plus an id index into it.
    let mut arena: Vec<Option<CommentNode>> = Vec::with_capacity(comments.len());
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(comments.len());
    for comment in comments {
        index.entry(comment.id).or_insert_with(|| {
            arena.push(Some(CommentNode::from(comment)));
            arena.len() - 1
        });
    }

    let mut roots: Vec<usize> = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); arena.len()];
    let mut placed: HashSet<usize> = HashSet::with_capacity(arena.len());

    for comment in comments {
        let slot = index[&comment.id];
        match comment.parent_id {
            None => {
                if placed.insert(slot) {
                    roots.push(slot);
                }
            }
            Some(parent_id) => {
                let parent = *index.get(&parent_id).ok_or(HierarchyError::MissingParent {
                    comment_id: comment.id,
                    parent_id,
                })?;
                if placed.insert(slot) {
                    children[parent].push(slot);
                }
            }
        }
    }

    Ok(roots
        .into_iter()
        .filter_map(|slot| assemble(slot, &mut arena, &children))
        .collect())
}

/// Moves the node out of the arena and attaches its replies, depth first.
fn assemble(
    slot: usize,
    arena: &mut [Option<CommentNode>],
    children: &[Vec<usize>],
) -> Option<CommentNode> {
    let mut node = arena[slot].take()?;
    node.replies = children[slot]
        .iter()
        .filter_map(|&child| assemble(child, arena, children))
        .collect();
    Some(node)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn comment(id: i64, parent_id: Option<i64>) -> Comment {
        Comment {
            id,
            post_id: 1,
            author_id: 7,
            author_username: "reader".to_string(),
            text: format!("comment number {id}"),
            parent_id,
            is_blocked: false,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, id as u32).unwrap(),
        }
    }

    fn count(nodes: &[CommentNode]) -> usize {
        nodes.iter().map(|n| 1 + count(&n.replies)).sum()
    }

    fn ids(nodes: &[CommentNode]) -> Vec<i64> {
        nodes.iter().map(|n| n.id).collect()
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        assert!(build_hierarchy(&[]).unwrap().is_empty());
    }

    #[test]
    fn nests_replies_under_parents() {
        // Newest first, as the store returns them.
        let input = vec![
            comment(5, Some(2)),
            comment(4, Some(1)),
            comment(3, None),
            comment(2, Some(1)),
            comment(1, None),
        ];

        let forest = build_hierarchy(&input).unwrap();

        assert_eq!(ids(&forest), vec![3, 1]);
        let first = &forest[1];
        assert_eq!(ids(&first.replies), vec![4, 2]);
        assert_eq!(ids(&first.replies[1].replies), vec![5]);
        assert_eq!(first.replies[1].author.username, "reader");
        assert_eq!(count(&forest), input.len());
    }

    #[test]
    fn reply_listed_before_its_parent_still_attaches() {
        let input = vec![comment(3, Some(2)), comment(2, Some(1)), comment(1, None)];

        let forest = build_hierarchy(&input).unwrap();

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(ids(&forest[0].replies), vec![2]);
        assert_eq!(ids(&forest[0].replies[0].replies), vec![3]);
    }

    #[test]
    fn duplicate_rows_are_placed_once() {
        let input = vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(2, Some(1)),
            comment(1, None),
            comment(3, Some(2)),
            comment(3, Some(2)),
        ];

        let forest = build_hierarchy(&input).unwrap();

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(ids(&forest[0].replies), vec![2]);
        assert_eq!(ids(&forest[0].replies[0].replies), vec![3]);
        assert_eq!(count(&forest), 3);
    }

    #[test]
    fn parent_outside_the_set_is_an_error() {
        let input = vec![comment(1, None), comment(9, Some(42))];

        assert_eq!(
            build_hierarchy(&input),
            Err(HierarchyError::MissingParent {
                comment_id: 9,
                parent_id: 42
            })
        );
    }

    #[test]
    fn building_twice_gives_equal_forests() {
        let input = vec![
            comment(6, Some(4)),
            comment(5, None),
            comment(4, Some(1)),
            comment(3, Some(1)),
            comment(2, None),
            comment(1, None),
        ];

        assert_eq!(build_hierarchy(&input), build_hierarchy(&input));
    }
}
