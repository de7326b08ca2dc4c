//! Signal history: append newly observed signals, supersede stale ones.
//!
//! After a merge the active subset is exactly the observed set. Signals that
//! were active but not observed again are kept with `is_active = false`, and
//! the inactive tail is capped so records do not grow without bound.

use reckon_types::Signal;

/// Merge `observed` into the record's `previous` signal list.
///
/// An observation already present in `previous` is (re)activated in place
/// instead of appended, so an unchanged signal set leaves the list as is.
/// At most `history_limit` inactive signals are retained, oldest dropped first.
pub fn merge_signals(previous: &[Signal], observed: Vec<Signal>, history_limit: usize) -> Vec<Signal> {
    let mut pending: Vec<Option<Signal>> = observed.into_iter().map(Some).collect();
    let mut merged: Vec<Signal> = previous.to_vec();

    // Newest entries first, so a re-observation reactivates the latest copy.
    for idx in (0..merged.len()).rev() {
        let matched = pending
            .iter_mut()
            .find(|slot| {
                slot.as_ref()
                    .is_some_and(|s| s.same_observation(&merged[idx]))
            })
            .and_then(Option::take);
        let existing = &mut merged[idx];
        match matched {
            Some(fresh) => {
                existing.trust_score = fresh.trust_score;
                existing.metadata = fresh.metadata;
                existing.recorded_by = fresh.recorded_by;
                existing.is_active = true;
            }
            None => existing.is_active = false,
        }
    }

    merged.extend(pending.into_iter().flatten().map(|mut s| {
        s.is_active = true;
        s
    }));

    let inactive = merged.iter().filter(|s| !s.is_active).count();
    let mut excess = inactive.saturating_sub(history_limit);
    if excess > 0 {
        merged.retain(|s| {
            if !s.is_active && excess > 0 {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    merged
}
