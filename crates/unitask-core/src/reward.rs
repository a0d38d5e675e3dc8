//! XP and level arithmetic.
//!
//! Two leveling curves exist and are kept apart on purpose:
//!
//! - [`apply_xp`] drives the reward state. Each level costs `level × 100` and
//!   the stored XP is the remainder inside the current level.
//! - [`profile_level`] derives a display level from lifetime XP for profiles
//!   and the leaderboard. Reaching level `n` needs `Σ_{k=2..=n} k × 100` in
//!   total (200, 500, 900, …).
//!
//! The two disagree from level 2 onwards; callers pick one by call site.

use serde::{Deserialize, Serialize};

/// XP cost multiplier per level.
pub const XP_PER_LEVEL: u64 = 100;

/// Settled reward state: `xp < level × 100` at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardState {
    pub xp: u64,
    pub level: u32,
}

impl Default for RewardState {
    fn default() -> Self {
        Self { xp: 0, level: 1 }
    }
}

impl RewardState {
    /// XP still needed to reach the next level.
    pub fn xp_to_next_level(&self) -> u64 {
        level_cost(self.level) - self.xp
    }

    pub fn is_settled(&self) -> bool {
        self.level >= 1 && self.xp < level_cost(self.level)
    }

    /// Award `delta` XP, leveling eagerly.
    pub fn award(self, delta: u64) -> Self {
        let (xp, level) = apply_xp(self.xp, self.level, delta);
        Self { xp, level }
    }
}

fn level_cost(level: u32) -> u64 {
    u64::from(level) * XP_PER_LEVEL
}

/// Add `delta` to `current_xp` and spend it on levels, each costing
/// `level × 100`.
///
/// `apply_xp(0, 1, 250) == (150, 2)`: 100 is spent on level 1 and the 150
/// left over is short of the 200 that level 2 costs.
pub fn apply_xp(current_xp: u64, current_level: u32, delta: u64) -> (u64, u32) {
    let start = u128::from(current_level.max(1));
    let total = spent_before(start) + u128::from(current_xp) + u128::from(delta);
    let estimate = (1.0 + (1.0 + 0.08 * total as f64).sqrt()) / 2.0;
    let level = highest_level(total, estimate, spent_before).min(u128::from(u32::MAX));
    let xp = total - spent_before(level);
    (u64::try_from(xp).unwrap_or(u64::MAX), level as u32)
}

/// XP spent on levels `1..level` under the per-level cost.
fn spent_before(level: u128) -> u128 {
    50 * level * (level - 1)
}

/// Largest `n >= 1` with `threshold(n) <= total`. `estimate` only has to be
/// close; the result is corrected in integers.
fn highest_level(total: u128, estimate: f64, threshold: impl Fn(u128) -> u128) -> u128 {
    let mut n = (estimate as u128).max(1);
    while n > 1 && threshold(n) > total {
        n -= 1;
    }
    while threshold(n + 1) <= total {
        n += 1;
    }
    n
}

/// State after a hard reset.
pub fn reset_xp() -> (u64, u32) {
    (0, 1)
}

/// Display level derived from lifetime XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLevel {
    pub level: u32,
    /// XP earned past the threshold of `level`.
    pub xp_into_level: u64,
    /// XP needed in total to go from `level` to `level + 1`.
    pub xp_for_next: u64,
}

/// Cumulative curve: level 1 at zero, level `n` at `Σ_{k=2..=n} k × 100`.
pub fn profile_level(total_xp: u64) -> ProfileLevel {
    let total = u128::from(total_xp);
    let estimate = ((1.0 + 0.08 * (total as f64 + 100.0)).sqrt() - 1.0) / 2.0;
    let level = highest_level(total, estimate, profile_threshold);
    // u64 XP tops out near level 6 × 10^8, well inside u32
    ProfileLevel {
        level: level as u32,
        xp_into_level: (total - profile_threshold(level)) as u64,
        xp_for_next: (level as u64 + 1) * XP_PER_LEVEL,
    }
}

/// Lifetime XP at which the profile reaches `level`.
fn profile_threshold(level: u128) -> u128 {
    50 * level * (level + 1) - 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn award_250_from_scratch_lands_on_level_two() {
        assert_eq!(apply_xp(0, 1, 250), (150, 2));
    }

    #[test]
    fn exact_threshold_levels_up() {
        assert_eq!(apply_xp(0, 1, 100), (0, 2));
        assert_eq!(apply_xp(99, 1, 1), (0, 2));
        assert_eq!(apply_xp(0, 1, 99), (99, 1));
    }

    #[test]
    fn large_award_crosses_several_levels() {
        // 100 + 200 + 300 = 600 spent, 50 left at level 4
        assert_eq!(apply_xp(0, 1, 650), (50, 4));
    }

    #[test]
    fn reset_is_origin() {
        assert_eq!(reset_xp(), (0, 1));
        assert_eq!(RewardState::default(), RewardState { xp: 0, level: 1 });
    }

    #[test]
    fn xp_to_next_level() {
        let state = RewardState::default().award(250);
        assert_eq!(state.xp_to_next_level(), 50);
    }

    #[test]
    fn profile_curve_thresholds() {
        assert_eq!(profile_level(0).level, 1);
        assert_eq!(profile_level(199).level, 1);
        assert_eq!(profile_level(200).level, 2);
        assert_eq!(profile_level(499).level, 2);
        assert_eq!(profile_level(500).level, 3);
        assert_eq!(profile_level(900).level, 4);
    }

    #[test]
    fn extreme_totals_stay_in_range() {
        let (xp, level) = apply_xp(0, 1, u64::MAX);
        assert!(RewardState { xp, level }.is_settled());

        let p = profile_level(u64::MAX);
        assert!(p.xp_into_level < p.xp_for_next);
        assert!(p.level > 1);
    }

    #[test]
    fn curves_diverge_from_level_two() {
        // 250 lifetime XP: incremental says level 2 with 150 banked,
        // cumulative says level 2 with 50 into the level.
        assert_eq!(apply_xp(0, 1, 250), (150, 2));
        let p = profile_level(250);
        assert_eq!((p.level, p.xp_into_level, p.xp_for_next), (2, 50, 300));

        // 100 lifetime XP is level 2 incrementally but still level 1 on the profile.
        assert_eq!(apply_xp(0, 1, 100).1, 2);
        assert_eq!(profile_level(100).level, 1);
    }

    fn settled() -> impl Strategy<Value = (u64, u32)> {
        (1u32..200).prop_flat_map(|level| (0..u64::from(level) * XP_PER_LEVEL, Just(level)))
    }

    proptest! {
        #[test]
        fn zero_delta_is_noop((xp, level) in settled()) {
            prop_assert_eq!(apply_xp(xp, level, 0), (xp, level));
        }

        #[test]
        fn result_is_always_settled((xp, level) in settled(), delta in 0u64..100_000) {
            let (new_xp, new_level) = apply_xp(xp, level, delta);
            prop_assert!(new_level >= level);
            let state = RewardState { xp: new_xp, level: new_level };
            prop_assert!(state.is_settled());
        }

        #[test]
        fn awards_compose((xp, level) in settled(), a in 0u64..10_000, b in 0u64..10_000) {
            let (x1, l1) = apply_xp(xp, level, a);
            prop_assert_eq!(apply_xp(x1, l1, b), apply_xp(xp, level, a + b));
        }

        #[test]
        fn closed_form_matches_level_by_level((xp, level) in settled(), delta in 0u64..200_000) {
            let (mut x, mut l) = (xp + delta, level);
            while x >= level_cost(l) {
                x -= level_cost(l);
                l += 1;
            }
            prop_assert_eq!(apply_xp(xp, level, delta), (x, l));
        }

        #[test]
        fn profile_level_is_monotonic(a in 0u64..1_000_000, b in 0u64..1_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(profile_level(lo).level <= profile_level(hi).level);
        }
    }
}
