//! Assembling loose spline segments into polylines.

use tracing::debug;

use crate::error::Result;

use super::Spline;

/// How the matched endpoints of two splines line up.
#[derive(Debug, Clone, Copy)]
enum Pairing {
    /// Tail of the target meets head of the other.
    EndStart,
    /// Tail meets tail.
    EndEnd,
    /// Head meets head.
    StartStart,
    /// Head meets tail.
    StartEnd,
}

/// Join loose segments into the minimal set of polylines.
///
/// Repeatedly finds, over all open splines in `list`, the globally nearest
/// endpoint pairing and splices the two splines (reversing one side as
/// needed) while the gap is within `join_error`; with `force_one` the
/// nearest pairing is spliced regardless of distance. Closed splines are
/// left alone. Shared boundary points are merged, with their knuckle flags
/// ORed together.
pub fn join_spline_segments(
    join_error: f64,
    force_one: bool,
    list: &mut Vec<Spline>,
) -> Result<()> {
    while let Some((target, other, pairing)) = find_best_merge(list, join_error, force_one) {
        let donor = list.remove(other);
        let target = if other < target { target - 1 } else { target };
        splice(&mut list[target], &donor, pairing)?;
    }
    debug!(segments = list.len(), "joined spline segments");
    Ok(())
}

fn find_best_merge(
    list: &[Spline],
    join_error: f64,
    force_one: bool,
) -> Option<(usize, usize, Pairing)> {
    let mut best: Option<(usize, usize, Pairing, f64)> = None;
    for i in 0..list.len() {
        if list[i].is_closed() {
            continue;
        }
        let (Some(si), Some(ei)) = (list[i].first_point(), list[i].last_point()) else {
            continue;
        };
        for j in 0..list.len() {
            if j == i || list[j].is_closed() {
                continue;
            }
            let (Some(sj), Some(ej)) = (list[j].first_point(), list[j].last_point()) else {
                continue;
            };
            let candidates = [
                ((ei - sj).norm(), Pairing::EndStart),
                ((ei - ej).norm(), Pairing::EndEnd),
                ((si - sj).norm(), Pairing::StartStart),
                ((si - ej).norm(), Pairing::StartEnd),
            ];
            for (dist, pairing) in candidates {
                if best.is_none_or(|(_, _, _, d)| dist < d) {
                    best = Some((i, j, pairing, dist));
                }
            }
        }
    }
    let (i, j, pairing, dist) = best?;
    (force_one || dist <= join_error).then_some((i, j, pairing))
}

fn splice(target: &mut Spline, donor: &Spline, pairing: Pairing) -> Result<()> {
    // Orient the target so the junction sits at its tail, then append the
    // donor with the shared point leading.
    let invert_donor = match pairing {
        Pairing::EndStart => false,
        Pairing::EndEnd => true,
        Pairing::StartStart => {
            target.invert_direction();
            false
        }
        Pairing::StartEnd => {
            target.invert_direction();
            true
        }
    };
    target.insert_spline(target.number_of_points(), invert_donor, false, donor)
}
