use std::cmp::Ordering;

use crate::models::driver::AvailableDriverCandidate;

/// Least-loaded first. Ties go to the courier whose shift started earliest,
/// then to the lowest driver id, so a given snapshot always ranks the same way.
pub fn compare_candidates(a: &AvailableDriverCandidate, b: &AvailableDriverCandidate) -> Ordering {
    a.current_deliveries_count
        .cmp(&b.current_deliveries_count)
        .then(a.shift_started_at.cmp(&b.shift_started_at))
        .then(a.driver_id.cmp(&b.driver_id))
}

pub fn rank_candidates(candidates: &mut [AvailableDriverCandidate]) {
    candidates.sort_by(compare_candidates);
}

pub fn pick_candidate(candidates: &[AvailableDriverCandidate]) -> Option<&AvailableDriverCandidate> {
    candidates.iter().min_by(|a, b| compare_candidates(a, b))
}
