//! Blocker graph checks.

use std::collections::HashSet;

use crate::error::{Result, TixError};

/// Check that making `id` blocked by `blocker` keeps the `blocked-by`
/// graph acyclic.
///
/// `blockers_of` returns the current `blocked-by` list of a ticket, or
/// `None` for an unknown id. A DFS from `blocker` along `blocked-by` edges
/// that reaches `id` means the new edge would close a cycle; the error
/// carries the full cycle `id -> blocker -> ... -> id`.
pub fn check_blocker_cycle<F>(id: &str, blocker: &str, blockers_of: F) -> Result<()>
where
    F: Fn(&str) -> Option<Vec<String>>,
{
    fn has_path_to<F>(
        current: &str,
        target: &str,
        blockers_of: &F,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> bool
    where
        F: Fn(&str) -> Option<Vec<String>>,
    {
        path.push(current.to_string());
        if current == target {
            return true;
        }
        if !visited.insert(current.to_string()) {
            path.pop();
            return false;
        }

        for next in blockers_of(current).unwrap_or_default() {
            if has_path_to(&next, target, blockers_of, visited, path) {
                return true;
            }
        }

        path.pop();
        false
    }

    let mut visited = HashSet::new();
    let mut path = vec![id.to_string()];

    if has_path_to(blocker, id, &blockers_of, &mut visited, &mut path) {
        return Err(TixError::BlockerCycle(path));
    }
    Ok(())
}
