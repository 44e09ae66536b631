// src/services/category.rs

use std::collections::HashMap;

use crate::models::category::{Category, CategoryNode};

/// All descendants of `root`, breadth first. `root` itself is not included.
pub fn descendant_ids(categories: &[Category], root: i64) -> Vec<i64> {
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for c in categories {
        if let Some(parent) = c.parent_id {
            children.entry(parent).or_default().push(c.id);
        }
    }

    let mut out = Vec::new();
    let mut queue = vec![root];
    while let Some(id) = queue.pop() {
        for child in children.get(&id).into_iter().flatten() {
            // Guards against a cycle that slipped into the table.
            if *child != root && !out.contains(child) {
                out.push(*child);
                queue.push(*child);
            }
        }
    }
    out
}

/// Attaches descendant ids to every category.
pub fn with_descendants(categories: Vec<Category>) -> Vec<CategoryNode> {
    let child_ids: Vec<Vec<i64>> = categories
        .iter()
        .map(|c| descendant_ids(&categories, c.id))
        .collect();

    categories
        .into_iter()
        .zip(child_ids)
        .map(|(category, child_ids)| CategoryNode { category, child_ids })
        .collect()
}

/// Whether moving `id` under `new_parent` would create a cycle.
pub fn would_cycle(categories: &[Category], id: i64, new_parent: i64) -> bool {
    new_parent == id || descendant_ids(categories, id).contains(&new_parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cat(id: i64, parent_id: Option<i64>) -> Category {
        Category {
            id,
            name: format!("Category {}", id),
            parent_id,
            remark: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tree() -> Vec<Category> {
        // 1 ─┬─ 2 ── 4
        //    └─ 3
        // 5
        vec![cat(1, None), cat(2, Some(1)), cat(3, Some(1)), cat(4, Some(2)), cat(5, None)]
    }

    #[test]
    fn collects_whole_subtree() {
        let mut ids = descendant_ids(&tree(), 1);
        ids.sort();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(descendant_ids(&tree(), 2), vec![4]);
        assert!(descendant_ids(&tree(), 5).is_empty());
    }

    #[test]
    fn nodes_carry_child_ids() {
        let nodes = with_descendants(tree());
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[3].child_ids, Vec::<i64>::new());
        assert_eq!(nodes[1].child_ids, vec![4]);
    }

    #[test]
    fn detects_cycles() {
        assert!(would_cycle(&tree(), 1, 4));
        assert!(would_cycle(&tree(), 2, 2));
        assert!(!would_cycle(&tree(), 4, 3));
    }
}
