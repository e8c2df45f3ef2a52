use crate::error::OptimizerError;
use crate::evaluation::cost::route_distance;
use crate::solver::CancelFlag;

/// Full-pass 2-opt with first-improvement acceptance: every improving
/// reversal is taken immediately and the scan continues from the updated
/// tour. Returns the final distance and the number of outer passes.
/// `on_improve(pass, distance)` fires once per accepted reversal.
pub fn improve_full(
    route: &mut Vec<usize>,
    dm: &[Vec<f64>],
    max_passes: usize,
    cancel: &CancelFlag,
    mut on_improve: impl FnMut(usize, f64),
) -> Result<(f64, usize), OptimizerError> {
    let n = route.len();
    let mut best = route_distance(route, dm);
    if n <= 2 {
        return Ok((best, 0));
    }

    let mut improved = true;
    let mut pass = 0;
    while improved && pass < max_passes {
        cancel.check()?;
        improved = false;
        pass += 1;

        for i in 1..n - 1 {
            for j in (i + 1)..n {
                let mut candidate = route.clone();
                candidate[i..=j].reverse();

                let candidate_distance = route_distance(&candidate, dm);
                if candidate_distance < best {
                    *route = candidate;
                    best = candidate_distance;
                    improved = true;
                    on_improve(pass, best);
                }
            }
        }
    }

    Ok((best, pass))
}

/// Bounded 2-opt used by the sampling optimizer: at most `max_passes`
/// passes, each restarting the scan after the first improving reversal.
pub fn improve_bounded(route: Vec<usize>, dm: &[Vec<f64>], max_passes: usize) -> Vec<usize> {
    let n = route.len();
    if n <= 3 {
        return route;
    }

    let mut current = route;
    let mut best_route = current.clone();
    let mut best = route_distance(&current, dm);

    for _ in 0..max_passes {
        let mut improved = false;

        'scan: for i in 1..n - 1 {
            for j in (i + 1)..n {
                let mut candidate = current.clone();
                candidate[i..=j].reverse();

                let candidate_distance = route_distance(&candidate, dm);
                if candidate_distance < best {
                    best_route = candidate;
                    best = candidate_distance;
                    improved = true;
                    break 'scan;
                }
            }
        }

        if !improved {
            break;
        }
        current = best_route.clone();
    }

    best_route
}
