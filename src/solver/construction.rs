use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Identity tour with the tail shuffled; index 0 stays in place.
pub fn random_route(n: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut route: Vec<usize> = (0..n).collect();
    if n > 1 {
        route[1..].shuffle(rng);
    }
    route
}

/// Greedy nearest-neighbor from index 0 over an arbitrary cost matrix
/// (time or distance). Ties go to the lowest index.
pub fn nearest_neighbor(matrix: &[Vec<f64>]) -> Vec<usize> {
    let n = matrix.len();
    let mut route = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    route.push(0);
    visited[0] = true;
    let mut current = 0;

    for _ in 1..n {
        let mut next = None;
        let mut best = f64::INFINITY;
        for (j, seen) in visited.iter().enumerate() {
            if !seen && (next.is_none() || matrix[current][j] < best) {
                best = matrix[current][j];
                next = Some(j);
            }
        }
        if let Some(j) = next {
            route.push(j);
            visited[j] = true;
            current = j;
        }
    }

    route
}

/// Farthest insertion over the distance matrix: seed with the most
/// distant pair, then repeatedly insert the point farthest from the
/// partial tour where it raises the open-tour cost the least (appending
/// at the end costs only the final leg). The finished tour is rotated so
/// index 0 leads.
pub fn farthest_insertion(dm: &[Vec<f64>]) -> Vec<usize> {
    let n = dm.len();
    if n <= 2 {
        return (0..n).collect();
    }

    let (mut a, mut b) = (0, 1);
    let mut max_dist = dm[0][1];
    for i in 0..n {
        for j in (i + 1)..n {
            if dm[i][j] > max_dist {
                max_dist = dm[i][j];
                a = i;
                b = j;
            }
        }
    }

    let mut route = vec![a, b];
    let mut in_route = vec![false; n];
    in_route[a] = true;
    in_route[b] = true;

    while route.len() < n {
        let mut point = None;
        let mut best_remoteness = f64::NEG_INFINITY;
        for p in 0..n {
            if in_route[p] {
                continue;
            }
            let remoteness = route
                .iter()
                .map(|&y| dm[p][y])
                .fold(f64::INFINITY, f64::min);
            if point.is_none() || remoteness > best_remoteness {
                best_remoteness = remoteness;
                point = Some(p);
            }
        }
        let Some(p) = point else { break };

        let mut best_pos = 1;
        let mut best_increase = f64::INFINITY;
        for pos in 1..=route.len() {
            let increase = if pos == route.len() {
                dm[route[route.len() - 1]][p]
            } else {
                dm[route[pos - 1]][p] + dm[p][route[pos]] - dm[route[pos - 1]][route[pos]]
            };
            if increase < best_increase {
                best_increase = increase;
                best_pos = pos;
            }
        }

        route.insert(best_pos, p);
        in_route[p] = true;
    }

    let zero_at = route.iter().position(|&x| x == 0).unwrap_or(0);
    route.rotate_left(zero_at);
    route
}

/// Stochastic walk from index 0: at each step the next city is sampled
/// among the unvisited with probability proportional to the current row
/// of the affinity matrix, uniformly when the restricted row sums to
/// zero.
pub fn stochastic_walk(affinities: &[Vec<f64>], rng: &mut ChaCha8Rng) -> Vec<usize> {
    let n = affinities.len();
    let mut route = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    route.push(0);
    visited[0] = true;
    let mut current = 0;

    while route.len() < n {
        let unvisited: Vec<usize> = (0..n).filter(|&j| !visited[j]).collect();
        let weights: Vec<f64> = unvisited.iter().map(|&j| affinities[current][j]).collect();

        let next = match WeightedIndex::new(&weights) {
            Ok(dist) => unvisited[dist.sample(rng)],
            Err(_) => unvisited[rng.gen_range(0..unvisited.len())],
        };

        route.push(next);
        visited[next] = true;
        current = next;
    }

    route
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::test_support::assert_permutation;
    use rand::SeedableRng;

    #[test]
    fn random_route_keeps_depot_first_and_is_reproducible() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let first = random_route(8, &mut rng);
        assert_eq!(first[0], 0);
        assert_permutation(&first, 8);

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(random_route(8, &mut rng), first);
    }

    #[test]
    fn nearest_neighbor_follows_cheapest_edges() {
        let dm = vec![
            vec![0.0, 10.0, 5.0, 8.0],
            vec![10.0, 0.0, 3.0, 4.0],
            vec![5.0, 3.0, 0.0, 6.0],
            vec![8.0, 4.0, 6.0, 0.0],
        ];
        assert_eq!(nearest_neighbor(&dm), vec![0, 2, 1, 3]);
    }

    #[test]
    fn nearest_neighbor_breaks_ties_toward_lowest_index() {
        let dm = vec![
            vec![0.0, 1.0, 1.0],
            vec![1.0, 0.0, 1.0],
            vec![1.0, 1.0, 0.0],
        ];
        assert_eq!(nearest_neighbor(&dm), vec![0, 1, 2]);
    }

    #[test]
    fn farthest_insertion_yields_depot_first_permutation() {
        let dm = vec![
            vec![0.0, 2.0, 9.0, 4.0],
            vec![2.0, 0.0, 6.0, 3.0],
            vec![9.0, 6.0, 0.0, 7.0],
            vec![4.0, 3.0, 7.0, 0.0],
        ];
        let route = farthest_insertion(&dm);
        assert_permutation(&route, 4);
        assert_eq!(route[0], 0);
    }

    #[test]
    fn stochastic_walk_visits_everything_even_with_zero_rows() {
        let affinities = vec![vec![0.0; 5]; 5];
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let route = stochastic_walk(&affinities, &mut rng);
        assert_permutation(&route, 5);
        assert_eq!(route[0], 0);
    }

    #[test]
    fn stochastic_walk_follows_dominant_affinities() {
        // A matrix that overwhelmingly prefers 0 -> 2 -> 1.
        let affinities = vec![
            vec![0.0, 1e-9, 1.0],
            vec![0.0, 0.0, 0.0],
            vec![0.0, 1.0, 1e-9],
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut hits = 0;
        for _ in 0..50 {
            if stochastic_walk(&affinities, &mut rng) == vec![0, 2, 1] {
                hits += 1;
            }
        }
        assert!(hits >= 45, "expected dominant path, got {hits}/50");
    }
}
