use clap::Subcommand;
use unitask_core::profile_level;
use unitask_core::repository::UserRepository;

use super::{print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum XpAction {
    /// Show current XP, level and lifetime progress
    Show,
    /// Grant XP by hand
    Award { amount: u64 },
    /// Reset XP and level (lifetime XP is kept)
    Reset,
    /// Rank profiles by lifetime XP
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

pub fn run(action: XpAction) -> CliResult {
    let session = Session::open()?;
    let rewards = session.app.rewards();

    match action {
        XpAction::Show => {
            let state = rewards.state()?;
            let total_xp = session
                .app
                .repositories()
                .users
                .get(&session.config.profile.user_id)?
                .map_or(0, |u| u.total_xp);
            print_json(&serde_json::json!({
                "xp": state.xp,
                "level": state.level,
                "xp_to_next_level": state.xp_to_next_level(),
                "total_xp": total_xp,
                "profile": profile_level(total_xp),
            }))?;
        }
        XpAction::Award { amount } => {
            print_json(&rewards.award_xp(amount)?)?;
        }
        XpAction::Reset => {
            rewards.reset()?;
            print_json(&rewards.state()?)?;
        }
        XpAction::Leaderboard { limit } => {
            print_json(&rewards.leaderboard(limit)?)?;
        }
    }
    Ok(())
}
