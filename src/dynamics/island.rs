use std::collections::HashSet;

/// Groups contact-connected active bodies and picks the groups that may sleep.
///
/// Bodies are identified by their index in the active set for the current step.
#[derive(Debug, Default)]
pub struct IslandSleeper {
    adjacency: Vec<Vec<usize>>,
}

impl IslandSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every island whose members are all sleep candidates.
    ///
    /// `connections` should only hold pairs of bodies that can push each other;
    /// contacts with statics never join islands.
    pub fn find_sleeping_islands(
        &mut self,
        candidates: &[bool],
        connections: &[(usize, usize)],
    ) -> Vec<Vec<usize>> {
        let body_count = candidates.len();
        self.adjacency.clear();
        self.adjacency.resize_with(body_count, Vec::new);
        for &(a, b) in connections {
            if a < body_count && b < body_count && a != b {
                self.adjacency[a].push(b);
                self.adjacency[b].push(a);
            }
        }

        let mut visited = HashSet::new();
        let mut islands = Vec::new();
        for start in 0..body_count {
            if visited.contains(&start) || !candidates[start] {
                continue;
            }
            let island = self.depth_first_collect(start, &mut visited);
            if island.iter().all(|&body| candidates[body]) {
                islands.push(island);
            }
        }

        log::trace!(
            "{} bodies, {} connections, {} islands going to sleep",
            body_count,
            connections.len(),
            islands.len()
        );
        islands
    }

    fn depth_first_collect(&self, start: usize, visited: &mut HashSet<usize>) -> Vec<usize> {
        let mut stack = vec![start];
        let mut result = Vec::new();

        while let Some(node) = stack.pop() {
            if visited.insert(node) {
                result.push(node);
                stack.extend(self.adjacency[node].iter().copied());
            }
        }

        result.sort_unstable();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn island_with_a_restless_member_stays_awake() {
        let mut sleeper = IslandSleeper::new();
        let candidates = [true, true, false, true];
        let islands = sleeper.find_sleeping_islands(&candidates, &[(0, 1), (1, 2)]);
        assert_eq!(islands, vec![vec![3]]);
    }

    #[test]
    fn calm_stack_sleeps_together() {
        let mut sleeper = IslandSleeper::new();
        let islands = sleeper.find_sleeping_islands(&[true, true, true], &[(2, 1), (1, 0)]);
        assert_eq!(islands, vec![vec![0, 1, 2]]);
    }
}
