//! Requires-graph utilities.
//!
//! Edges are stored as adjacency lists of registry indices: `requires[i]`
//! lists the options that option `i` depends on.

use crate::error::RegistryError;

/// Return the nodes that can never be ordered because they sit on (or
/// behind) a cycle, using Kahn's algorithm.
///
/// An empty result means the graph is acyclic.
pub(super) fn unorderable_nodes(requires: &[Vec<usize>]) -> Vec<usize> {
    let n = requires.len();
    let mut in_degree: Vec<usize> = requires
        .iter()
        .map(|deps| deps.iter().filter(|&&d| d < n).count())
        .collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, deps) in requires.iter().enumerate() {
        for &dep in deps {
            if let Some(rd) = dependents.get_mut(dep) {
                rd.push(i);
            }
        }
    }

    let mut queue: Vec<usize> = in_degree
        .iter()
        .enumerate()
        .filter_map(|(i, &d)| (d == 0).then_some(i))
        .collect();

    while let Some(idx) = queue.pop() {
        if let Some(ds) = dependents.get(idx) {
            for &dep in ds {
                if let Some(count) = in_degree.get_mut(dep) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push(dep);
                    }
                }
            }
        }
    }

    in_degree
        .iter()
        .enumerate()
        .filter_map(|(i, &d)| (d > 0).then_some(i))
        .collect()
}

/// Collect every transitive dependency of `root` in depth-first pre-order.
///
/// The traversal is iterative and tracks a visited set, so shared
/// dependencies (diamonds) are reported once. Reaching a node that is still
/// on the traversal path is a cycle and is reported with the offending path,
/// rendered through `name`. `root` itself is not part of the result.
pub(super) fn dependency_closure<'a>(
    requires: &[Vec<usize>],
    root: usize,
    name: impl Fn(usize) -> &'a str,
) -> Result<Vec<usize>, RegistryError> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; requires.len()];
    let mut order = Vec::new();
    // (node, position of the next child to visit)
    let mut path: Vec<(usize, usize)> = vec![(root, 0)];
    if let Some(m) = marks.get_mut(root) {
        *m = Mark::OnPath;
    }

    while let Some(top) = path.last_mut() {
        let node = top.0;
        let child = requires.get(node).and_then(|deps| deps.get(top.1)).copied();
        top.1 += 1;

        let Some(child) = child else {
            if let Some(m) = marks.get_mut(node) {
                *m = Mark::Done;
            }
            path.pop();
            continue;
        };

        match marks.get(child).copied() {
            Some(Mark::Unvisited) => {
                if let Some(m) = marks.get_mut(child) {
                    *m = Mark::OnPath;
                }
                order.push(child);
                path.push((child, 0));
            }
            Some(Mark::OnPath) => {
                let start = path.iter().position(|&(n, _)| n == child).unwrap_or(0);
                let mut names: Vec<&str> = path
                    .iter()
                    .skip(start)
                    .map(|&(n, _)| name(n))
                    .collect();
                names.push(name(child));
                return Err(RegistryError::DependencyCycle(names.join(" -> ")));
            }
            Some(Mark::Done) | None => {}
        }
    }

    Ok(order)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const NAMES: [&str; 5] = ["a", "b", "c", "d", "e"];

    fn name(i: usize) -> &'static str {
        NAMES[i]
    }

    // -----------------------------------------------------------------------
    // unorderable_nodes
    // -----------------------------------------------------------------------

    #[test]
    fn independent_nodes_are_acyclic() {
        let graph = vec![vec![], vec![], vec![]];
        assert!(unorderable_nodes(&graph).is_empty());
    }

    #[test]
    fn diamond_is_acyclic() {
        // a -> b, a -> c, b -> d, c -> d
        let graph = vec![vec![1, 2], vec![3], vec![3], vec![]];
        assert!(unorderable_nodes(&graph).is_empty());
    }

    #[test]
    fn two_node_cycle_is_reported() {
        let graph = vec![vec![1], vec![0], vec![]];
        assert_eq!(unorderable_nodes(&graph), vec![0, 1]);
    }

    #[test]
    fn self_loop_is_reported() {
        let graph = vec![vec![0]];
        assert_eq!(unorderable_nodes(&graph), vec![0]);
    }

    // -----------------------------------------------------------------------
    // dependency_closure
    // -----------------------------------------------------------------------

    #[test]
    fn closure_is_pre_order() {
        // a -> b -> c, a -> d
        let graph = vec![vec![1, 3], vec![2], vec![], vec![], vec![]];
        assert_eq!(dependency_closure(&graph, 0, name).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn closure_visits_shared_dependency_once() {
        let graph = vec![vec![1, 2], vec![3], vec![3], vec![]];
        assert_eq!(dependency_closure(&graph, 0, name).unwrap(), vec![1, 3, 2]);
    }

    #[test]
    fn closure_of_leaf_is_empty() {
        let graph = vec![vec![], vec![0]];
        assert!(dependency_closure(&graph, 0, name).unwrap().is_empty());
    }

    #[test]
    fn closure_reports_cycle_path() {
        // a -> b -> c -> b
        let graph = vec![vec![1], vec![2], vec![1]];
        let err = dependency_closure(&graph, 0, name).unwrap_err();
        assert_eq!(err, RegistryError::DependencyCycle("b -> c -> b".to_string()));
    }

    #[test]
    fn closure_reports_cycle_through_root() {
        let graph = vec![vec![1], vec![0]];
        let err = dependency_closure(&graph, 0, name).unwrap_err();
        assert_eq!(err, RegistryError::DependencyCycle("a -> b -> a".to_string()));
    }

    #[test]
    fn deep_chain_is_not_bounded() {
        // A chain longer than any fixed recursion cap still resolves.
        let len = 64;
        let graph: Vec<Vec<usize>> = (0..len)
            .map(|i| if i + 1 < len { vec![i + 1] } else { vec![] })
            .collect();
        let closure = dependency_closure(&graph, 0, |_| "n").unwrap();
        assert_eq!(closure.len(), len - 1);
    }
}
