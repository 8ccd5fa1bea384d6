//! Priority calculator (spec §4.5 / component E).
//!
//! Computes the task priority of a scheduled child so that serial
//! descendants receive monotonically decreasing urgency: later children in
//! a serial parent run at higher priority than earlier ones, so that once
//! they're finally scheduled they're serviced ahead of unrelated concurrent
//! branches.

use crate::node::Node;

/// `weight(node)`: 1 for an Action; for a Task, the max child weight+1 if
/// parallel, else the sum of child weight+1.
pub fn weight(node: &Node) -> i64 {
    match node {
        Node::Action(_) => 1,
        Node::Job(b) | Node::Task(b) => {
            if b.children.is_empty() {
                1
            } else if b.parallel {
                b.children.iter().map(|c| weight(c) + 1).max().unwrap_or(0)
            } else {
                b.children.iter().map(|c| weight(c) + 1).sum()
            }
        }
    }
}

/// Priority of `parent.children[index]`, given the parent's own priority.
///
/// For a serial parent, each earlier sibling contributes `weight - 1` to the
/// running sum rather than the raw weight: `weight` already counts one "+1"
/// for the level the sibling occupies, which the `P + 1` base term for the
/// child itself already accounts for.
pub fn child_priority(parent: &Node, parent_priority: i32, index: usize) -> i32 {
    if parent.parallel() || index == 0 {
        return parent_priority + 1;
    }
    let children = parent.children();
    let preceding_weight: i64 = children[..index].iter().map(|c| weight(c) - 1).sum();
    parent_priority + 1 + preceding_weight as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ActionBuilder, BranchBuilder};

    fn action() -> Node {
        ActionBuilder::new().role("noop").build()
    }

    #[test]
    fn action_weight_is_one() {
        assert_eq!(weight(&action()), 1);
    }

    #[test]
    fn serial_priority_is_monotonically_increasing() {
        // Job with 3 serial Tasks, each a single Action (spec §8 scenario 6).
        let job = BranchBuilder::job("J")
            .add_task(BranchBuilder::task("T0").add_action(action()).build())
            .add_task(BranchBuilder::task("T1").add_action(action()).build())
            .add_task(BranchBuilder::task("T2").add_action(action()).build())
            .build();

        let p0 = child_priority(&job, 1, 0);
        let p1 = child_priority(&job, 1, 1);
        let p2 = child_priority(&job, 1, 2);
        assert_eq!((p0, p1, p2), (2, 3, 4));
        assert!(p0 < p1 && p1 < p2);
    }

    #[test]
    fn parallel_parent_gives_every_child_the_same_priority() {
        let job = BranchBuilder::job("J")
            .parallel(true)
            .add_action(action())
            .add_action(action())
            .build();
        assert_eq!(child_priority(&job, 1, 0), 2);
        assert_eq!(child_priority(&job, 1, 1), 2);
    }
}
