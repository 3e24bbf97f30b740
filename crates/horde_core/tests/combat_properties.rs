//! Property tests for damage, healing and kill attribution.

use horde_core::combat::{heal, hurt};
use horde_core::components::Health;
use horde_core::prelude::*;
use horde_core::waves::scaled_max_health;
use horde_test_utils::determinism::strategies::{arb_damage, arb_health, arb_multiplier};
use horde_test_utils::fixtures::{fixed, ground, quiet_match};
use proptest::prelude::*;

proptest! {
    #[test]
    fn health_never_exceeds_bounds(max in arb_health(), hits in proptest::collection::vec(arb_damage(), 0..20)) {
        let mut health = Health::new(max);
        for damage in hits {
            let before = health.current;
            let event = hurt(&mut health, 1, damage);
            prop_assert!(health.current <= health.max);
            prop_assert_eq!(event.resulting_health, health.current);
            prop_assert!(event.damage <= before);
        }
    }

    #[test]
    fn death_is_reported_exactly_once(max in arb_health(), hits in proptest::collection::vec(arb_damage(), 1..40)) {
        let mut health = Health::new(max);
        let deaths = hits
            .into_iter()
            .map(|damage| hurt(&mut health, 1, damage))
            .filter(|event| event.died)
            .count();
        prop_assert!(deaths <= 1);
        prop_assert_eq!(deaths == 1, health.is_dead());
    }

    #[test]
    fn healing_clamps_and_skips_the_dead(max in arb_health(), damage in arb_damage(), amount in arb_health()) {
        let mut health = Health::new(max);
        hurt(&mut health, 1, damage);
        let was_dead = health.is_dead();
        let before = health.current;
        let healed = heal(&mut health, amount);
        prop_assert!(health.current <= health.max);
        if was_dead {
            prop_assert_eq!(healed, 0);
            prop_assert_eq!(health.current, 0);
        } else {
            prop_assert_eq!(health.current, before + healed);
        }
    }

    #[test]
    fn scaled_health_is_positive(base in 1u32..100, multiplier in arb_multiplier(), players in 0usize..8) {
        let scaled = scaled_max_health(base, multiplier, players);
        prop_assert!(scaled >= 1);
    }

    #[test]
    fn scaled_health_matches_formula(base in 1u32..100, multiplier in arb_multiplier(), players in 1u32..16) {
        let exact = f64::from(base) * multiplier.to_num::<f64>() * f64::from(players);
        let expected = (exact.round() as u32).max(1);
        prop_assert_eq!(scaled_max_health(base, multiplier, players as usize), expected);
    }

    #[test]
    fn kills_credited_once_per_enemy(damages in proptest::collection::vec(1u32..4, 1..30)) {
        let mut sim = quiet_match(1);
        let player = sim.players().ids()[0];
        let enemy = sim.spawn_enemy("statue", ground(5, 5), fixed(1)).unwrap();

        let mut deaths = 0;
        for damage in damages {
            match sim.hurt_enemy(enemy, damage, Some(player)) {
                Ok(event) => deaths += usize::from(event.died),
                Err(GameError::EntityNotFound(_)) => {}
                Err(other) => return Err(TestCaseError::fail(other.to_string())),
            }
        }
        let kills = sim.player(player).unwrap().kills;
        prop_assert_eq!(kills as usize, deaths);
        prop_assert_eq!(sim.enemy(enemy).is_none(), deaths == 1);
    }
}

#[test]
fn zero_damage_changes_nothing() {
    let mut health = Health::new(5);
    let event = hurt(&mut health, 7, 0);
    assert!(!event.changed_health());
    assert!(!event.died);
    assert_eq!(health.current, 5);
}

#[test]
fn enemy_hurt_emits_flash_and_health_events() {
    let mut sim = quiet_match(1);
    let player = sim.players().ids()[0];
    let enemy = sim.spawn_enemy("statue", ground(5, 5), fixed(1)).unwrap();
    sim.tick();

    sim.hurt_enemy(enemy, 2, Some(player)).unwrap();
    let events = sim.tick();
    assert!(events.replication.contains(&ReplicationEvent::HealthChanged {
        entity: enemy,
        old: 5,
        new: 3,
    }));
    assert!(events
        .replication
        .contains(&ReplicationEvent::DamageFlash { entity: enemy }));
}

#[test]
fn auto_attack_kills_nearby_enemy() {
    let mut config = horde_test_utils::fixtures::quiet_config(4);
    config.player.auto_attack = true;
    let mut sim = Simulation::new(
        config,
        WaveCatalog::empty(),
        &horde_test_utils::fixtures::registry_with_statue(),
    );
    let player = sim.add_player("gunner");
    let enemy = sim.spawn_enemy("statue", ground(0, 6), fixed(1)).unwrap();

    // One shot per second, 5 hp.
    for _ in 0..(7 * TICK_RATE) {
        sim.tick();
    }
    assert!(sim.enemy(enemy).is_none());
    assert_eq!(sim.player(player).unwrap().kills, 1);
}
