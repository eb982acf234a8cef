//! Combat system - ability timing, hitboxes, damage and knockback

use serde::Serialize;

use super::character::SpecialKind;
use super::ledge::{LedgeGrabSystem, LedgeRelease};
use super::player::{Player, PlayerTimers};
use super::stage::Rect;
use super::InputState;
use crate::ws::protocol::GameEvent;

/// Base launch speed (pixels per nominal tick) before ability multipliers
pub const BASE_KNOCKBACK: f32 = 8.0;
/// Extra launch speed per point of accumulated percentage
pub const KNOCKBACK_SCALING: f32 = 0.12;
/// Forward speed imparted by the dash special
pub const DASH_SPEED: f32 = 12.0;
/// Upward speed imparted by the dash special
pub const DASH_LIFT: f32 = 2.0;

/// Cooldown and active window for one ability (ms)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityTiming {
    pub cooldown_ms: f32,
    pub active_ms: f32,
}

pub const BASIC_TIMING: AbilityTiming = AbilityTiming {
    cooldown_ms: 300.0,
    active_ms: 150.0,
};
pub const SPECIAL_TIMING: AbilityTiming = AbilityTiming {
    cooldown_ms: 500.0,
    active_ms: 250.0,
};
pub const GUARD_TIMING: AbilityTiming = AbilityTiming {
    cooldown_ms: 400.0,
    active_ms: 200.0,
};

/// The three timed abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ability {
    Basic,
    Special,
    Guard,
}

impl Ability {
    pub fn timing(self) -> AbilityTiming {
        match self {
            Ability::Basic => BASIC_TIMING,
            Ability::Special => SPECIAL_TIMING,
            Ability::Guard => GUARD_TIMING,
        }
    }

    fn timers(self, timers: &mut PlayerTimers) -> (&mut f32, &mut f32) {
        match self {
            Ability::Basic => (&mut timers.basic_cooldown, &mut timers.basic_active),
            Ability::Special => (&mut timers.special_cooldown, &mut timers.special_active),
            Ability::Guard => (&mut timers.guard_cooldown, &mut timers.guard_active),
        }
    }
}

/// Concrete attack shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Basic,
    GroundPound,
    Dash,
}

impl AttackKind {
    /// Launch angle above horizontal, in degrees
    pub fn launch_angle_deg(self) -> f32 {
        match self {
            AttackKind::Basic => 45.0,
            AttackKind::Dash => 30.0,
            AttackKind::GroundPound => 75.0,
        }
    }

    fn for_special(kind: SpecialKind) -> Self {
        match kind {
            SpecialKind::GroundPound => AttackKind::GroundPound,
            SpecialKind::Dash => AttackKind::Dash,
        }
    }
}

/// Combat system for ability state and hit resolution
pub struct CombatSystem;

impl CombatSystem {
    /// An ability can start only when both its timers have run out
    pub fn can_activate(timers: &PlayerTimers, ability: Ability) -> bool {
        let (cooldown, active) = match ability {
            Ability::Basic => (timers.basic_cooldown, timers.basic_active),
            Ability::Special => (timers.special_cooldown, timers.special_active),
            Ability::Guard => (timers.guard_cooldown, timers.guard_active),
        };
        cooldown <= 0.0 && active <= 0.0
    }

    /// Start both timers for `ability`
    fn start(timers: &mut PlayerTimers, ability: Ability) {
        let timing = ability.timing();
        let (cooldown, active) = ability.timers(timers);
        *cooldown = timing.cooldown_ms;
        *active = timing.active_ms;
    }

    /// Start guarding if requested and allowed. Runs before movement and
    /// attacks so a fresh guard gates the jump and attacks of the same tick.
    pub fn try_guard(player: &mut Player, input: &InputState) -> bool {
        if !input.guard
            || player.is_guarding
            || player.is_attacking()
            || !Self::can_activate(&player.timers, Ability::Guard)
        {
            return false;
        }
        Self::start(&mut player.timers, Ability::Guard);
        player.is_guarding = true;
        true
    }

    /// Start at most one attack from this tick's input and resolve its hit
    /// against the opponent, if there is one.
    pub fn try_attack(
        attacker: &mut Player,
        opponent: Option<&mut Player>,
        input: &InputState,
    ) -> Vec<GameEvent> {
        if attacker.is_guarding || attacker.is_attacking() {
            return Vec::new();
        }

        let kind = if input.basic_attack && Self::can_activate(&attacker.timers, Ability::Basic) {
            Self::start(&mut attacker.timers, Ability::Basic);
            attacker.is_basic_attacking = true;
            AttackKind::Basic
        } else if input.special_attack && Self::can_activate(&attacker.timers, Ability::Special) {
            Self::start(&mut attacker.timers, Ability::Special);
            attacker.is_special_attacking = true;
            AttackKind::for_special(attacker.profile().special)
        } else {
            return Vec::new();
        };

        let hitbox = Self::hitbox(attacker, kind);
        if kind == AttackKind::Dash {
            attacker.vx = attacker.facing * DASH_SPEED;
            attacker.vy = -DASH_LIFT;
        }

        match opponent {
            Some(target) if hitbox.overlaps(&target.bounds()) => {
                vec![Self::resolve_hit(attacker, target, kind)]
            }
            _ => Vec::new(),
        }
    }

    /// Hitbox for `kind`, placed from the attacker's current position
    pub fn hitbox(attacker: &Player, kind: AttackKind) -> Rect {
        let profile = attacker.profile();
        let body = attacker.bounds();
        match kind {
            AttackKind::Basic => {
                let range = profile.basic_range;
                let x = if attacker.facing > 0.0 {
                    body.right()
                } else {
                    body.x - range
                };
                Rect::new(x, body.y, range, body.height)
            }
            AttackKind::Dash => {
                let range = profile.special_range;
                let x = if attacker.facing > 0.0 {
                    body.x
                } else {
                    body.x - range
                };
                Rect::new(x, body.y, body.width + range, body.height)
            }
            AttackKind::GroundPound => {
                let range = profile.special_range;
                Rect::new(
                    body.x - range / 2.0,
                    body.y + body.height / 2.0,
                    body.width + range,
                    body.height / 2.0 + range * 0.75,
                )
            }
        }
    }

    fn resolve_hit(attacker: &Player, target: &mut Player, kind: AttackKind) -> GameEvent {
        if target.is_hanging() {
            LedgeGrabSystem::release(target, LedgeRelease::LetGo);
        }

        let profile = attacker.profile();
        let (damage, multiplier) = match kind {
            AttackKind::Basic => (profile.basic_damage, profile.basic_knockback),
            AttackKind::GroundPound | AttackKind::Dash => {
                (profile.special_damage, profile.special_knockback)
            }
        };
        let (dir_x, dir_y) = Self::launch_direction(kind, attacker.facing);

        if target.is_guarding {
            let impulse = Self::guarded_impulse(multiplier, target.profile().guard_reduction);
            target.vx += dir_x * impulse;
            target.vy += dir_y * impulse;
            return GameEvent::Blocked {
                attacker: attacker.slot,
                target: target.slot,
                attack: kind,
            };
        }

        target.percentage += damage;
        let magnitude = Self::knockback_magnitude(
            multiplier,
            target.percentage,
            target.profile().gravity_multiplier,
        );
        target.vx = dir_x * magnitude;
        target.vy = dir_y * magnitude;
        target.on_ground = false;

        GameEvent::Hit {
            attacker: attacker.slot,
            target: target.slot,
            attack: kind,
            damage,
            percentage: target.percentage,
        }
    }

    /// Launch speed for an unguarded hit
    pub fn knockback_magnitude(multiplier: f32, percentage: f32, gravity_multiplier: f32) -> f32 {
        (BASE_KNOCKBACK * multiplier + percentage * KNOCKBACK_SCALING) / gravity_multiplier
    }

    /// Pushback for a guarded hit; independent of accumulated percentage
    pub fn guarded_impulse(multiplier: f32, guard_reduction: f32) -> f32 {
        BASE_KNOCKBACK * multiplier * (1.0 - guard_reduction)
    }

    /// Unit launch vector, y negative is up
    fn launch_direction(kind: AttackKind, facing: f32) -> (f32, f32) {
        let angle = kind.launch_angle_deg().to_radians();
        (facing * angle.cos(), -angle.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::character::CharacterType;
    use crate::game::player::Slot;
    use crate::game::stage::SpawnPoint;

    fn player(slot: Slot, character: CharacterType, x: f32, y: f32) -> Player {
        let mut p = Player::new(slot, character, SpawnPoint { x: 0.0, y: 0.0 });
        p.x = x;
        p.y = y;
        p.on_ground = true;
        p
    }

    fn basic() -> InputState {
        InputState {
            basic_attack: true,
            ..Default::default()
        }
    }

    fn special() -> InputState {
        InputState {
            special_attack: true,
            ..Default::default()
        }
    }

    #[test]
    fn guarded_basic_hit_adds_no_damage() {
        let mut attacker = player(Slot::One, CharacterType::RedKnight, 100.0, 400.0);
        let mut defender = player(Slot::Two, CharacterType::BlueNinja, 160.0, 400.0);
        defender.percentage = 30.0;
        assert!(CombatSystem::try_guard(&mut defender, &InputState { guard: true, ..Default::default() }));

        let events = CombatSystem::try_attack(&mut attacker, Some(&mut defender), &basic());
        assert!(matches!(events.as_slice(), [GameEvent::Blocked { .. }]));
        assert_eq!(defender.percentage, 30.0);
        assert!(defender.is_guarding);

        let expected = CombatSystem::guarded_impulse(1.2, 0.8);
        let speed = (defender.vx * defender.vx + defender.vy * defender.vy).sqrt();
        assert!((speed - expected).abs() < 1e-3);
        assert!(defender.vx > 0.0);
    }

    #[test]
    fn guarded_impulse_ignores_percentage() {
        let mut a1 = player(Slot::One, CharacterType::RedKnight, 100.0, 400.0);
        let mut a2 = a1.clone();
        let mut fresh = player(Slot::Two, CharacterType::RedKnight, 160.0, 400.0);
        let mut damaged = fresh.clone();
        damaged.percentage = 150.0;
        fresh.is_guarding = true;
        damaged.is_guarding = true;
        CombatSystem::try_attack(&mut a1, Some(&mut fresh), &basic());
        CombatSystem::try_attack(&mut a2, Some(&mut damaged), &basic());
        assert_eq!((fresh.vx, fresh.vy), (damaged.vx, damaged.vy));
    }

    #[test]
    fn unguarded_basic_hit_launches_at_45_degrees() {
        let mut attacker = player(Slot::One, CharacterType::RedKnight, 100.0, 400.0);
        let mut defender = player(Slot::Two, CharacterType::BlueNinja, 160.0, 400.0);

        let events = CombatSystem::try_attack(&mut attacker, Some(&mut defender), &basic());
        assert_eq!(events.len(), 1);
        assert_eq!(defender.percentage, 7.0);
        assert!(!defender.on_ground);

        let magnitude = (8.0 * 1.2 + 7.0 * KNOCKBACK_SCALING) / 0.95;
        let component = magnitude * std::f32::consts::FRAC_1_SQRT_2;
        assert!((defender.vx - component).abs() < 1e-3);
        assert!((defender.vy + component).abs() < 1e-3);
    }

    #[test]
    fn knockback_grows_with_percentage() {
        let low = CombatSystem::knockback_magnitude(1.0, 0.0, 1.0);
        let high = CombatSystem::knockback_magnitude(1.0, 100.0, 1.0);
        assert!(high > low);
        let light = CombatSystem::knockback_magnitude(1.0, 50.0, 0.5);
        assert!((light - 2.0 * CombatSystem::knockback_magnitude(1.0, 50.0, 1.0)).abs() < 1e-4);
    }

    #[test]
    fn miss_has_no_effect_on_opponent() {
        let mut attacker = player(Slot::One, CharacterType::RedKnight, 100.0, 400.0);
        let mut defender = player(Slot::Two, CharacterType::BlueNinja, 400.0, 400.0);
        let events = CombatSystem::try_attack(&mut attacker, Some(&mut defender), &basic());
        assert!(events.is_empty());
        assert!(attacker.is_basic_attacking);
        assert_eq!(defender.percentage, 0.0);
        assert_eq!((defender.vx, defender.vy), (0.0, 0.0));
    }

    #[test]
    fn attack_against_missing_opponent_is_noop() {
        let mut attacker = player(Slot::One, CharacterType::RedKnight, 100.0, 400.0);
        let events = CombatSystem::try_attack(&mut attacker, None, &basic());
        assert!(events.is_empty());
        assert!(attacker.is_basic_attacking);
    }

    #[test]
    fn attack_is_rejected_until_both_timers_clear() {
        let mut attacker = player(Slot::One, CharacterType::RedKnight, 100.0, 400.0);
        CombatSystem::try_attack(&mut attacker, None, &basic());
        assert_eq!(attacker.timers.basic_cooldown, BASIC_TIMING.cooldown_ms);
        assert_eq!(attacker.timers.basic_active, BASIC_TIMING.active_ms);

        // Active window ends, flag clears, cooldown still running.
        let expired = attacker.timers.advance(BASIC_TIMING.active_ms);
        assert!(expired.basic);
        attacker.is_basic_attacking = false;
        assert!(!CombatSystem::can_activate(&attacker.timers, Ability::Basic));
        CombatSystem::try_attack(&mut attacker, None, &basic());
        assert!(!attacker.is_basic_attacking);

        attacker.timers.advance(BASIC_TIMING.cooldown_ms);
        assert!(CombatSystem::can_activate(&attacker.timers, Ability::Basic));
        CombatSystem::try_attack(&mut attacker, None, &basic());
        assert!(attacker.is_basic_attacking);
    }

    #[test]
    fn guarding_blocks_attack_activation() {
        let mut attacker = player(Slot::One, CharacterType::RedKnight, 100.0, 400.0);
        let both = InputState {
            guard: true,
            basic_attack: true,
            ..Default::default()
        };
        assert!(CombatSystem::try_guard(&mut attacker, &both));
        let events = CombatSystem::try_attack(&mut attacker, None, &both);
        assert!(events.is_empty());
        assert!(!attacker.is_basic_attacking);
        assert_eq!(attacker.timers.basic_cooldown, 0.0);
    }

    #[test]
    fn attacking_player_cannot_start_guard() {
        let mut attacker = player(Slot::One, CharacterType::RedKnight, 100.0, 400.0);
        CombatSystem::try_attack(&mut attacker, None, &basic());
        let guard = InputState { guard: true, ..Default::default() };
        assert!(!CombatSystem::try_guard(&mut attacker, &guard));
        assert!(!attacker.is_guarding);
    }

    #[test]
    fn ground_pound_hits_defender_below() {
        let mut attacker = player(Slot::One, CharacterType::RedKnight, 200.0, 330.0);
        attacker.on_ground = false;
        let mut defender = player(Slot::Two, CharacterType::BlueNinja, 200.0, 400.0);

        let events = CombatSystem::try_attack(&mut attacker, Some(&mut defender), &special());
        assert!(matches!(
            events.as_slice(),
            [GameEvent::Hit { attack: AttackKind::GroundPound, .. }]
        ));
        assert_eq!(defender.percentage, 12.0);
        assert!(!defender.on_ground);
        assert!(defender.vy < 0.0);
        assert!(defender.vy.abs() > defender.vx.abs());
        assert!(attacker.is_special_attacking);
        assert_eq!(attacker.vx, 0.0);
    }

    #[test]
    fn dash_moves_attacker_forward() {
        let mut attacker = player(Slot::Two, CharacterType::BlueNinja, 300.0, 400.0);
        attacker.facing = -1.0;
        let mut defender = player(Slot::One, CharacterType::RedKnight, 230.0, 400.0);

        let events = CombatSystem::try_attack(&mut attacker, Some(&mut defender), &special());
        assert_eq!(events.len(), 1);
        assert_eq!(attacker.vx, -DASH_SPEED);
        assert_eq!(attacker.vy, -DASH_LIFT);
        assert_eq!(defender.percentage, 8.0);
        assert!(defender.vx < 0.0);
    }

    #[test]
    fn hit_knocks_opponent_off_ledge() {
        let mut attacker = player(Slot::One, CharacterType::RedKnight, 100.0, 400.0);
        let mut defender = player(Slot::Two, CharacterType::BlueNinja, 160.0, 400.0);
        defender.ledge = Some(crate::game::player::LedgeGrip {
            platform: 0,
            side: crate::game::player::LedgeSide::Right,
        });
        defender.timers.ledge_hang = 1000.0;
        CombatSystem::try_attack(&mut attacker, Some(&mut defender), &basic());
        assert!(!defender.is_hanging());
        assert_eq!(defender.timers.ledge_hang, 0.0);
        assert_eq!(defender.percentage, 7.0);
    }
}
