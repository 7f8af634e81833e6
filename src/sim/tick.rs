//! Per-frame simulation tick
//!
//! Advances the player and enemies by one step in a fixed order:
//! input, jump, gravity/integration, platforms, coins, enemies, level clear.

use rand::Rng;

use super::level::generate_level;
use super::state::{LevelState, Player};
use crate::consts::*;

/// Input flags for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub left: bool,
    pub right: bool,
    /// Jump request. Whether this means "held" or "pressed this tick" is up to the caller.
    pub jump: bool,
}

/// Things that happened during a tick, for the session to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Coins picked up this tick
    CoinsCollected { count: u32 },
    /// Player touched an enemy
    PlayerHit { hp: u32 },
    /// Player's hp reached zero
    PlayerDefeated,
    /// All coins gone; the new level has been generated
    LevelCompleted { level: u32 },
}

/// Advance the simulation by one tick
pub fn tick<R: Rng + ?Sized>(
    player: &mut Player,
    level: &mut LevelState,
    input: &TickInput,
    rng: &mut R,
) -> Vec<GameEvent> {
    let mut events = Vec::new();

    // Movement is direct, no acceleration
    player.vel.x = 0.0;
    if input.left {
        player.vel.x = -player.speed;
    }
    if input.right {
        player.vel.x = player.speed;
    }

    // Jump / double jump
    if input.jump {
        if player.grounded {
            player.vel.y = -player.jump_power;
            player.grounded = false;
            player.jumps_remaining = player.air_jumps();
        } else if player.double_jump && player.jumps_remaining > 0 {
            player.vel.y = -player.jump_power * DOUBLE_JUMP_FACTOR;
            player.jumps_remaining -= 1;
        }
    }

    // Gravity and integration
    player.vel.y += level.gravity;
    player.pos += player.vel;
    player.pos.x = player.pos.x.clamp(0.0, WORLD_WIDTH - PLAYER_SIZE);

    // Land on platforms (falling only). Every platform is tested against the
    // same body; the last match in stored order wins.
    player.grounded = false;
    let body = player.rect();
    let feet = body.bottom();
    let landing = level.platforms.iter().rev().find(|platform| {
        body.overlaps_x(platform)
            && feet > platform.y
            && feet < platform.bottom()
            && player.vel.y > 0.0
    });
    if let Some(platform) = landing {
        player.pos.y = platform.y - PLAYER_SIZE;
        player.vel.y = 0.0;
        player.grounded = true;
        player.jumps_remaining = player.air_jumps();
    }

    // Coin pickup
    let center = player.center();
    let before = level.coins.len();
    level
        .coins
        .retain(|coin| center.distance(coin.center()) >= COIN_PICKUP_RADIUS);
    let collected = (before - level.coins.len()) as u32;
    if collected > 0 {
        events.push(GameEvent::CoinsCollected { count: collected });
    }

    // Enemies
    for enemy in &mut level.enemies {
        enemy.patrol();

        if enemy.rect().overlaps(&player.rect()) && !player.is_dead() {
            player.hp = player.hp.saturating_sub(1);
            player.vel.y = ENEMY_KNOCKBACK;
            events.push(GameEvent::PlayerHit { hp: player.hp });
            if player.is_dead() {
                events.push(GameEvent::PlayerDefeated);
            }
        }
    }

    // Level clear
    if level.is_cleared() {
        let cleared = level.level;
        let next = cleared.saturating_add(1).min(MAX_LEVEL);
        *level = generate_level(next, rng);
        player.respawn();
        log::info!("Level {} complete, entering level {}", cleared, next);
        events.push(GameEvent::LevelCompleted { level: next });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::Upgrades;
    use crate::sim::state::{Coin, Enemy};
    use glam::Vec2;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    /// Player standing on the ground at x, with a far-away coin so the level never clears
    fn setup(x: f32) -> (Player, LevelState, Pcg32) {
        let mut player = Player::from_upgrades(&Upgrades::default());
        player.pos = Vec2::new(x, 350.0 - PLAYER_SIZE);
        player.grounded = true;
        let mut level = LevelState::empty(1);
        level.coins.push(Coin {
            pos: Vec2::new(700.0, 100.0),
        });
        (player, level, Pcg32::seed_from_u64(1))
    }

    #[test]
    fn test_standing_on_ground_stays_grounded() {
        let (mut player, mut level, mut rng) = setup(50.0);
        for _ in 0..10 {
            tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        }
        assert!(player.grounded);
        assert_eq!(player.pos.y, 318.0);
        assert_eq!(player.vel.y, 0.0);
    }

    #[test]
    fn test_horizontal_input_sets_velocity() {
        let (mut player, mut level, mut rng) = setup(200.0);
        let right = TickInput {
            right: true,
            ..Default::default()
        };
        tick(&mut player, &mut level, &right, &mut rng);
        assert_eq!(player.vel.x, 5.0);
        assert_eq!(player.pos.x, 205.0);

        let both = TickInput {
            left: true,
            right: true,
            ..Default::default()
        };
        tick(&mut player, &mut level, &both, &mut rng);
        assert_eq!(player.vel.x, 5.0);

        tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        assert_eq!(player.vel.x, 0.0);
        assert_eq!(player.pos.x, 210.0);
    }

    #[test]
    fn test_player_cannot_leave_world() {
        let (mut player, mut level, mut rng) = setup(2.0);
        let left = TickInput {
            left: true,
            ..Default::default()
        };
        tick(&mut player, &mut level, &left, &mut rng);
        assert_eq!(player.pos.x, 0.0);
    }

    #[test]
    fn test_ground_jump() {
        let (mut player, mut level, mut rng) = setup(50.0);
        let jump = TickInput {
            jump: true,
            ..Default::default()
        };
        tick(&mut player, &mut level, &jump, &mut rng);
        assert!(!player.grounded);
        assert_eq!(player.vel.y, -11.5);
        assert_eq!(player.pos.y, 318.0 - 11.5);
        assert_eq!(player.jumps_remaining, 0);
    }

    #[test]
    fn test_held_jump_consumes_double_jump_next_tick() {
        let (mut player, mut level, mut rng) = setup(50.0);
        player.double_jump = true;
        let jump = TickInput {
            jump: true,
            ..Default::default()
        };
        tick(&mut player, &mut level, &jump, &mut rng);
        assert_eq!(player.jumps_remaining, 1);

        tick(&mut player, &mut level, &jump, &mut rng);
        assert_eq!(player.jumps_remaining, 0);
        assert!((player.vel.y - (-12.0 * 0.8 + 0.5)).abs() < 1e-5);

        // No third jump while airborne
        let vel_before = player.vel.y;
        tick(&mut player, &mut level, &jump, &mut rng);
        assert_eq!(player.vel.y, vel_before + 0.5);
    }

    #[test]
    fn test_double_jump_requires_upgrade() {
        let (mut player, mut level, mut rng) = setup(50.0);
        let jump = TickInput {
            jump: true,
            ..Default::default()
        };
        tick(&mut player, &mut level, &jump, &mut rng);
        let vel_before = player.vel.y;
        tick(&mut player, &mut level, &jump, &mut rng);
        assert_eq!(player.vel.y, vel_before + 0.5);
    }

    #[test]
    fn test_lands_on_floating_platform() {
        let (mut player, mut level, mut rng) = setup(150.0);
        level.platforms.push(crate::sim::Rect::new(140.0, 250.0, 100.0, 20.0));
        player.grounded = false;
        player.pos.y = 250.0 - PLAYER_SIZE - 1.0;
        player.vel.y = 2.0;
        tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        assert!(player.grounded);
        assert_eq!(player.pos.y, 250.0 - PLAYER_SIZE);
    }

    #[test]
    fn test_overlapping_platforms_last_one_wins() {
        let (mut player, mut level, mut rng) = setup(150.0);
        level.platforms.push(crate::sim::Rect::new(140.0, 250.0, 100.0, 20.0));
        level.platforms.push(crate::sim::Rect::new(140.0, 255.0, 100.0, 20.0));
        player.grounded = false;
        // Feet end up at 258: inside both platforms
        player.pos.y = 258.0 - PLAYER_SIZE - 2.5;
        player.vel.y = 2.0;
        tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        assert!(player.grounded);
        assert_eq!(player.pos.y, 255.0 - PLAYER_SIZE);
    }

    #[test]
    fn test_rising_player_passes_through_platform() {
        let (mut player, mut level, mut rng) = setup(150.0);
        level.platforms.push(crate::sim::Rect::new(140.0, 250.0, 100.0, 20.0));
        player.grounded = false;
        player.pos.y = 250.0 - PLAYER_SIZE + 5.0;
        player.vel.y = -3.0;
        tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        assert!(!player.grounded);
    }

    #[test]
    fn test_coin_pickup_radius_is_strict() {
        // Player center lands at (66, 334)
        let (mut player, mut level, mut rng) = setup(50.0);
        level.coins.push(Coin {
            pos: Vec2::new(66.0 + 25.0 - 8.0, 334.0 - 8.0),
        });
        let events = tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        assert_eq!(level.coins.len(), 2);
        assert!(events.is_empty());

        level.coins[1].pos.x -= 0.5;
        let events = tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        assert_eq!(level.coins.len(), 1);
        assert_eq!(events, vec![GameEvent::CoinsCollected { count: 1 }]);
    }

    #[test]
    fn test_multiple_coins_collected_same_tick() {
        let (mut player, mut level, mut rng) = setup(50.0);
        for dx in [-4.0, 0.0, 4.0] {
            level.coins.push(Coin {
                pos: Vec2::new(58.0 + dx, 326.0),
            });
        }
        let events = tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        assert_eq!(level.coins.len(), 1);
        assert_eq!(events, vec![GameEvent::CoinsCollected { count: 3 }]);
    }

    #[test]
    fn test_enemy_contact_damages_and_knocks_back() {
        let (mut player, mut level, mut rng) = setup(300.0);
        level.enemies.push(Enemy {
            pos: Vec2::new(300.0, 318.0),
            dir: 1.0,
            speed: 1.0,
        });
        let events = tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        assert_eq!(player.hp, 2);
        assert_eq!(player.vel.y, ENEMY_KNOCKBACK);
        assert_eq!(events, vec![GameEvent::PlayerHit { hp: 2 }]);
    }

    #[test]
    fn test_last_hit_reports_defeat() {
        let (mut player, mut level, mut rng) = setup(300.0);
        player.hp = 1;
        level.enemies.push(Enemy {
            pos: Vec2::new(300.0, 318.0),
            dir: 1.0,
            speed: 1.0,
        });
        level.enemies.push(Enemy {
            pos: Vec2::new(305.0, 318.0),
            dir: 1.0,
            speed: 1.0,
        });
        let events = tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        assert_eq!(player.hp, 0);
        assert_eq!(
            events,
            vec![GameEvent::PlayerHit { hp: 0 }, GameEvent::PlayerDefeated]
        );
    }

    #[test]
    fn test_last_coin_completes_level() {
        let (mut player, mut level, mut rng) = setup(50.0);
        level.coins.clear();
        level.coins.push(Coin {
            pos: Vec2::new(58.0, 326.0),
        });
        player.hp = 1;
        let events = tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        assert_eq!(
            events,
            vec![
                GameEvent::CoinsCollected { count: 1 },
                GameEvent::LevelCompleted { level: 2 }
            ]
        );
        assert_eq!(level.level, 2);
        assert_eq!(level.coins.len(), 9);
        assert_eq!(player.pos, SPAWN);
        assert_eq!(player.hp, player.max_hp);
    }

    #[test]
    fn test_clearing_the_last_level_repeats_it() {
        let (mut player, _, mut rng) = setup(50.0);
        let mut level = LevelState::empty(MAX_LEVEL);
        let events = tick(&mut player, &mut level, &TickInput::default(), &mut rng);
        assert_eq!(events, vec![GameEvent::LevelCompleted { level: MAX_LEVEL }]);
        assert_eq!(level.level, MAX_LEVEL);
        assert_eq!(level.coins.len(), 15);
    }

    proptest! {
        #[test]
        fn prop_pickup_iff_within_radius(dx in -40.0f32..40.0, dy in -40.0f32..40.0) {
            // Player settles with its center at (66, 334)
            let (mut player, mut level, mut rng) = setup(50.0);
            level.coins.push(Coin {
                pos: Vec2::new(58.0 + dx, 326.0 + dy),
            });
            let center = Vec2::new(66.0, 334.0);
            let coin_center = level.coins[1].center();
            tick(&mut player, &mut level, &TickInput::default(), &mut rng);

            prop_assert_eq!(player.center(), center);
            let picked = level.coins.len() == 1;
            prop_assert_eq!(picked, center.distance(coin_center) < COIN_PICKUP_RADIUS);
        }

        #[test]
        fn prop_hp_stays_in_bounds(
            seed in any::<u64>(),
            inputs in prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>()), 1..400),
        ) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut level = generate_level(8, &mut rng);
            let mut player = Player::from_upgrades(&Upgrades::default());
            for (left, right, jump) in inputs {
                let input = TickInput { left, right, jump };
                let events = tick(&mut player, &mut level, &input, &mut rng);
                prop_assert!(player.hp <= player.max_hp);
                if events.contains(&GameEvent::LevelCompleted { level: level.level }) {
                    prop_assert_eq!(player.hp, player.max_hp);
                }
                if player.is_dead() {
                    break;
                }
                prop_assert!(player.pos.x >= 0.0 && player.pos.x <= WORLD_WIDTH - PLAYER_SIZE);
            }
        }
    }
}
