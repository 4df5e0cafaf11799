use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::game::Game;
use crate::registry::Registry;

/// Authorization and timing guards for the sale-phase transitions.
/// Kept behind a trait so the gating rules can be swapped without
/// touching the ledger.
pub trait LifecyclePolicy: Send + Sync {
    /// May `caller` freeze admission on this game?
    fn may_start(&self, registry: &Registry, game: &Game, caller: Uuid) -> bool;

    /// May `caller` cancel this game at `now`?
    fn may_cancel(&self, registry: &Registry, game: &Game, caller: Uuid, now: DateTime<Utc>)
        -> bool;

    /// Should the join that fills the last seat start the game
    /// immediately?
    fn auto_start_on_full(&self) -> bool {
        true
    }
}

/// Owner/creator gating, with public cancellation once the sale deadline
/// has passed without reaching the minimum player count.
#[derive(Debug, Default)]
pub struct DefaultPolicy;

impl LifecyclePolicy for DefaultPolicy {
    fn may_start(&self, registry: &Registry, game: &Game, caller: Uuid) -> bool {
        registry.is_owner(caller) || caller == game.creator
    }

    fn may_cancel(
        &self,
        registry: &Registry,
        game: &Game,
        caller: Uuid,
        now: DateTime<Utc>,
    ) -> bool {
        if registry.is_owner(caller) || caller == game.creator {
            return true;
        }

        match game.sale_deadline {
            Some(deadline) => now > deadline && game.player_count < game.min_players,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fixture() -> (Registry, Game, Uuid) {
        let owner = Uuid::new_v4();
        let registry = Registry::new(owner, None, 10).unwrap();
        let deadline = Utc::now();
        let game = Game::new(0, owner, 2, 4, 10, Some(deadline)).unwrap();
        (registry, game, owner)
    }

    #[test]
    fn test_owner_may_start_and_cancel() {
        let (registry, game, owner) = fixture();
        let policy = DefaultPolicy;

        assert!(policy.may_start(&registry, &game, owner));
        assert!(policy.may_cancel(&registry, &game, owner, Utc::now()));
    }

    #[test]
    fn test_stranger_gated_by_deadline() {
        let (registry, game, _) = fixture();
        let policy = DefaultPolicy;
        let stranger = Uuid::new_v4();
        let deadline = game.sale_deadline.unwrap();

        assert!(!policy.may_start(&registry, &game, stranger));
        // before the deadline: no public cancellation
        assert!(!policy.may_cancel(&registry, &game, stranger, deadline - Duration::minutes(1)));
        // after the deadline with too few players: anyone may cancel
        assert!(policy.may_cancel(&registry, &game, stranger, deadline + Duration::minutes(1)));
    }

    #[test]
    fn test_no_public_cancel_once_minimum_met() {
        let (registry, mut game, _) = fixture();
        let policy = DefaultPolicy;
        let stranger = Uuid::new_v4();
        let after = game.sale_deadline.unwrap() + Duration::minutes(1);

        game.admit(Uuid::new_v4(), 10).unwrap();
        game.admit(Uuid::new_v4(), 10).unwrap();
        assert!(!policy.may_cancel(&registry, &game, stranger, after));
    }

    #[test]
    fn test_no_deadline_means_no_public_cancel() {
        let owner = Uuid::new_v4();
        let registry = Registry::new(owner, None, 10).unwrap();
        let game = Game::new(0, owner, 2, 4, 10, None).unwrap();

        assert!(!DefaultPolicy.may_cancel(&registry, &game, Uuid::new_v4(), Utc::now()));
    }
}
