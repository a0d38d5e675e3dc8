use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{Result, ValidationError};
use crate::model::{UserProfile, MAX_TOTAL_XP};
use crate::repository::{RewardRepository, UserRepository};
use crate::reward::{profile_level, ProfileLevel, RewardState};

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub display_name: String,
    pub total_xp: u64,
    pub level: ProfileLevel,
}

/// XP awards for the active profile.
///
/// The incremental reward state and the profile's lifetime XP are updated
/// together; the latter feeds the leaderboard's cumulative level.
#[derive(Clone)]
pub struct RewardService {
    rewards: Arc<dyn RewardRepository>,
    users: Arc<dyn UserRepository>,
    profile: Option<UserProfile>,
}

impl RewardService {
    pub fn new(rewards: Arc<dyn RewardRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            rewards,
            users,
            profile: None,
        }
    }

    /// Credit awards to `profile` as well, creating it on first use.
    pub fn for_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn state(&self) -> Result<RewardState> {
        self.rewards.state()
    }

    pub fn observe(&self) -> watch::Receiver<RewardState> {
        self.rewards.observe()
    }

    pub fn observe_xp(&self) -> watch::Receiver<u64> {
        self.rewards.observe_xp()
    }

    pub fn observe_level(&self) -> watch::Receiver<u32> {
        self.rewards.observe_level()
    }

    /// Award `delta` XP. Deltas above [`MAX_TOTAL_XP`] are rejected before
    /// anything is written.
    pub fn award_xp(&self, delta: u64) -> Result<RewardState> {
        if delta > MAX_TOTAL_XP {
            return Err(ValidationError::InvalidValue {
                field: "xp",
                message: format!("award must be at most {MAX_TOTAL_XP}"),
            }
            .into());
        }
        if let Some(profile) = &self.profile {
            self.ensure_profile(profile)?;
        }

        let before = self.rewards.state()?;
        let after = self.rewards.add_xp(delta)?;
        if let Some(profile) = &self.profile {
            self.users.add_total_xp(&profile.id, delta)?;
        }
        if after.level > before.level {
            tracing::info!(from = before.level, to = after.level, "level up");
        }
        tracing::debug!(delta, xp = after.xp, level = after.level, "xp awarded");
        Ok(after)
    }

    fn ensure_profile(&self, profile: &UserProfile) -> Result<()> {
        if self.users.get(&profile.id)?.is_none() {
            self.users.upsert(profile)?;
        }
        Ok(())
    }

    /// Hard reset to level 1 with no XP. Lifetime XP is kept.
    pub fn reset(&self) -> Result<()> {
        self.rewards.reset()?;
        tracing::info!("reward state reset");
        Ok(())
    }

    /// Profiles ranked by lifetime XP, ties broken by name.
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut users = self.users.list()?;
        users.sort_by(|a, b| {
            b.total_xp
                .cmp(&a.total_xp)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        Ok(users
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, u)| LeaderboardEntry {
                rank: i + 1,
                level: profile_level(u.total_xp),
                user_id: u.id,
                display_name: u.display_name,
                total_xp: u.total_xp,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::storage::memory::{MemoryRewardRepository, MemoryUserRepository};

    fn service() -> (RewardService, Arc<MemoryUserRepository>) {
        let users = Arc::new(MemoryUserRepository::default());
        let svc = RewardService::new(Arc::new(MemoryRewardRepository::default()), users.clone());
        (svc, users)
    }

    #[test]
    fn award_settles_level() {
        let (svc, _) = service();
        assert_eq!(svc.award_xp(250).unwrap(), RewardState { xp: 150, level: 2 });
        assert_eq!(svc.award_xp(0).unwrap(), RewardState { xp: 150, level: 2 });
        assert_eq!(svc.award_xp(50).unwrap(), RewardState { xp: 0, level: 3 });
    }

    #[test]
    fn reset_returns_to_origin() {
        let (svc, _) = service();
        svc.award_xp(999).unwrap();
        svc.reset().unwrap();
        assert_eq!(svc.state().unwrap(), RewardState::default());
    }

    #[test]
    fn profile_credit_creates_and_accumulates() {
        let (svc, users) = service();
        let svc = svc.for_profile(UserProfile::new("u1", "Ana"));
        svc.award_xp(150).unwrap();
        svc.award_xp(100).unwrap();
        svc.reset().unwrap();

        let u = users.get("u1").unwrap().unwrap();
        assert_eq!(u.total_xp, 250);
    }

    #[test]
    fn oversized_award_is_rejected_untouched() {
        let (svc, users) = service();
        let svc = svc.for_profile(UserProfile::new("u1", "Ana"));
        svc.award_xp(30).unwrap();

        assert!(matches!(
            svc.award_xp(MAX_TOTAL_XP + 1),
            Err(CoreError::Validation(ValidationError::InvalidValue { field: "xp", .. }))
        ));
        assert_eq!(svc.state().unwrap(), RewardState { xp: 30, level: 1 });
        assert_eq!(users.get("u1").unwrap().unwrap().total_xp, 30);
    }

    #[test]
    fn lifetime_xp_saturates_on_sqlite() {
        use crate::storage::{SqliteRewardRepository, SqliteStore};

        let store = Arc::new(SqliteStore::open_memory().unwrap());
        store
            .upsert(&UserProfile {
                total_xp: MAX_TOTAL_XP - 1,
                ..UserProfile::new("u1", "Ana")
            })
            .unwrap();
        let svc = RewardService::new(
            Arc::new(SqliteRewardRepository::new(store.clone(), "u1")),
            store.clone(),
        )
        .for_profile(UserProfile::new("u1", "Ana"));

        svc.award_xp(500).unwrap();
        svc.award_xp(1).unwrap();
        assert_eq!(
            UserRepository::get(&*store, "u1").unwrap().unwrap().total_xp,
            MAX_TOTAL_XP
        );
        assert_eq!(svc.leaderboard(1).unwrap()[0].total_xp, MAX_TOTAL_XP);
    }

    #[test]
    fn leaderboard_orders_and_levels() {
        let (svc, users) = service();
        for (id, name, xp) in [("a", "Ana", 250), ("b", "Ben", 900), ("c", "Cai", 250), ("d", "Dee", 0)] {
            users
                .upsert(&UserProfile {
                    id: id.into(),
                    display_name: name.into(),
                    total_xp: xp,
                })
                .unwrap();
        }

        let board = svc.leaderboard(3).unwrap();
        let names: Vec<&str> = board.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Ben", "Ana", "Cai"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].level.level, 4);
        assert_eq!(board[1].level.level, 2);
    }

    #[tokio::test]
    async fn level_observer_sees_level_up() {
        let (svc, _) = service();
        let mut level = svc.observe_level();
        assert_eq!(*level.borrow(), 1);

        svc.award_xp(100).unwrap();
        level.changed().await.unwrap();
        assert_eq!(*level.borrow(), 2);
    }
}
