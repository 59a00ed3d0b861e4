use serde::{Deserialize, Serialize};

/// Timestamps are milliseconds of game time.
pub type Millis = u64;

const POISON_DURATION: Millis = 30_000;
const POISON_INTERVAL: Millis = 5_000;
const POISON_MAX_STACKS: u8 = 5;
const POISON_DAMAGE_PER_STACK: i32 = 3;

const STUN_BASE_DURATION: Millis = 2_000;
const STUN_MAX_FROM_NOW: Millis = 10_000;

const SLOW_DURATION: Millis = 15_000;

const BLEED_DURATION: Millis = 20_000;
const BLEED_INTERVAL: Millis = 3_000;
const BLEED_BASE_DAMAGE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoisonEffect {
    pub stacks: u8,
    pub applied_at: Millis,
    pub last_tick_at: Millis,
}

impl PoisonEffect {
    pub fn damage_per_tick(&self) -> i32 {
        POISON_DAMAGE_PER_STACK * self.stacks as i32
    }

    fn expired(&self, now: Millis) -> bool {
        now.saturating_sub(self.applied_at) >= POISON_DURATION
    }

    /// Deal one tick of damage when the interval has elapsed.
    fn tick(&mut self, now: Millis) -> i32 {
        if now.saturating_sub(self.last_tick_at) >= POISON_INTERVAL {
            self.last_tick_at = now;
            self.damage_per_tick()
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StunEffect {
    pub applied_at: Millis,
    pub ends_at: Millis,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowEffect {
    /// Movement/action time multiplier, at least 1.0.
    pub multiplier: f64,
    pub applied_at: Millis,
}

impl SlowEffect {
    fn expired(&self, now: Millis) -> bool {
        now.saturating_sub(self.applied_at) >= SLOW_DURATION
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BleedEffect {
    pub damage_per_tick: i32,
    pub applied_at: Millis,
    pub last_tick_at: Millis,
}

impl BleedEffect {
    fn expired(&self, now: Millis) -> bool {
        self.damage_per_tick <= 0 || now.saturating_sub(self.applied_at) >= BLEED_DURATION
    }

    fn tick(&mut self, now: Millis) -> i32 {
        if now.saturating_sub(self.last_tick_at) >= BLEED_INTERVAL {
            self.last_tick_at = now;
            self.damage_per_tick
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: String,
    pub value: f64,
    pub is_percent: bool,
    pub duration: Millis,
    pub applied_at: Millis,
}

impl StatModifier {
    fn expired(&self, now: Millis) -> bool {
        now.saturating_sub(self.applied_at) >= self.duration
    }
}

/// Result of one effect tick: damage dealt after expirations ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub damage: i32,
    pub expired: Vec<&'static str>,
}

/// Per-combatant status effects: at most one each of poison, stun, slow
/// and bleed, plus unbounded stat modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectManager {
    pub poison: Option<PoisonEffect>,
    pub stun: Option<StunEffect>,
    pub slow: Option<SlowEffect>,
    pub bleed: Option<BleedEffect>,
    pub modifiers: Vec<StatModifier>,
}

impl EffectManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply or stack poison: stacks climb to 5, the duration refreshes to
    /// full on every application.
    pub fn apply_poison(&mut self, now: Millis) {
        match &mut self.poison {
            Some(poison) => {
                poison.stacks = (poison.stacks + 1).min(POISON_MAX_STACKS);
                poison.applied_at = now;
            }
            None => {
                self.poison = Some(PoisonEffect {
                    stacks: 1,
                    applied_at: now,
                    last_tick_at: now,
                });
            }
        }
    }

    /// Apply a stun: reapplication extends from the later of (existing end,
    /// now), but the end never exceeds 10 s from now.
    pub fn apply_stun(&mut self, now: Millis, duration: Option<Millis>) {
        let duration = duration.unwrap_or(STUN_BASE_DURATION);
        let ends_at = match &self.stun {
            Some(stun) if stun.ends_at > now => stun.ends_at + duration,
            _ => now + duration,
        };
        self.stun = Some(StunEffect {
            applied_at: now,
            ends_at: ends_at.min(now + STUN_MAX_FROM_NOW),
        });
    }

    /// Apply a slow. The latest application replaces any previous one;
    /// magnitudes do not stack.
    pub fn apply_slow(&mut self, now: Millis, multiplier: f64) {
        self.slow = Some(SlowEffect {
            multiplier: multiplier.max(1.0),
            applied_at: now,
        });
    }

    pub fn apply_bleed(&mut self, now: Millis) {
        self.bleed = Some(BleedEffect {
            damage_per_tick: BLEED_BASE_DAMAGE,
            applied_at: now,
            last_tick_at: now,
        });
    }

    /// Movement staunches a bleed: each move event drops its damage by one
    /// until it stops entirely.
    pub fn on_movement(&mut self) {
        if let Some(bleed) = &mut self.bleed {
            bleed.damage_per_tick = (bleed.damage_per_tick - 1).max(0);
        }
    }

    pub fn add_modifier(&mut self, modifier: StatModifier) {
        self.modifiers.push(modifier);
    }

    pub fn is_stunned(&self, now: Millis) -> bool {
        self.stun.is_some_and(|s| s.ends_at > now)
    }

    /// Current slow multiplier, 1.0 when unslowed.
    pub fn slow_multiplier(&self, now: Millis) -> f64 {
        match &self.slow {
            Some(slow) if !slow.expired(now) => slow.multiplier,
            _ => 1.0,
        }
    }

    /// Effective stat value from unexpired modifiers: flat bonuses first,
    /// then the summed percentage on top.
    pub fn calculate_stat(&self, stat: &str, base: f64, now: Millis) -> f64 {
        let mut flat = 0.0;
        let mut percent = 0.0;
        for modifier in &self.modifiers {
            if modifier.stat != stat || modifier.expired(now) {
                continue;
            }
            if modifier.is_percent {
                percent += modifier.value;
            } else {
                flat += modifier.value;
            }
        }
        (base + flat) * (1.0 + percent / 100.0)
    }

    /// One effect pass: expirations are evaluated before any damage tick,
    /// then due DoT ticks fire, and the modifier list is compacted.
    pub fn tick(&mut self, now: Millis) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if self.poison.is_some_and(|p| p.expired(now)) {
            self.poison = None;
            outcome.expired.push("poison");
        }
        if self.stun.is_some_and(|s| s.ends_at <= now) {
            self.stun = None;
            outcome.expired.push("stun");
        }
        if self.slow.is_some_and(|s| s.expired(now)) {
            self.slow = None;
            outcome.expired.push("slow");
        }
        if self.bleed.is_some_and(|b| b.expired(now)) {
            self.bleed = None;
            outcome.expired.push("bleed");
        }

        if let Some(poison) = &mut self.poison {
            outcome.damage += poison.tick(now);
        }
        if let Some(bleed) = &mut self.bleed {
            outcome.damage += bleed.tick(now);
        }

        self.modifiers.retain(|m| !m.expired(now));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poison_stacks_cap_at_five() {
        let mut effects = EffectManager::new();
        for _ in 0..8 {
            effects.apply_poison(0);
        }
        let poison = effects.poison.unwrap();
        assert_eq!(poison.stacks, 5);
        assert_eq!(poison.damage_per_tick(), 15);
    }

    #[test]
    fn poison_ticks_on_interval() {
        let mut effects = EffectManager::new();
        effects.apply_poison(0);

        assert_eq!(effects.tick(1_000).damage, 0, "Interval not yet elapsed");
        assert_eq!(effects.tick(5_000).damage, 3, "First tick at 5 s");
        assert_eq!(effects.tick(6_000).damage, 0, "Interval resets after tick");
        assert_eq!(effects.tick(10_000).damage, 3);
    }

    #[test]
    fn poison_reapplication_refreshes_duration() {
        let mut effects = EffectManager::new();
        effects.apply_poison(0);
        effects.apply_poison(25_000);

        // Would have expired at 30 s from the first application; the
        // refresh pushed that to 55 s.
        let outcome = effects.tick(40_000);
        assert!(outcome.expired.is_empty());
        assert!(effects.poison.is_some());

        let outcome = effects.tick(55_000);
        assert_eq!(outcome.expired, vec!["poison"]);
        assert!(effects.poison.is_none());
    }

    #[test]
    fn poison_expiry_runs_before_damage() {
        let mut effects = EffectManager::new();
        effects.apply_poison(0);
        effects.tick(5_000);

        // At exactly 30 s the poison expires; no parting tick.
        let outcome = effects.tick(30_000);
        assert_eq!(outcome.expired, vec!["poison"]);
        assert_eq!(outcome.damage, 0, "Expired effects deal no damage");
    }

    #[test]
    fn stun_base_duration() {
        let mut effects = EffectManager::new();
        effects.apply_stun(1_000, None);
        assert!(effects.is_stunned(2_999));
        assert!(!effects.is_stunned(3_000));
    }

    #[test]
    fn stun_extension_caps_at_ten_seconds_from_now() {
        let mut effects = EffectManager::new();
        // Repeated heavy stuns can never push past now + 10 s.
        for _ in 0..10 {
            effects.apply_stun(0, Some(4_000));
        }
        let stun = effects.stun.unwrap();
        assert_eq!(stun.ends_at, 10_000);
        assert!(effects.is_stunned(9_999));
        assert!(!effects.is_stunned(10_000));
    }

    #[test]
    fn stun_extends_from_later_of_end_and_now() {
        let mut effects = EffectManager::new();
        effects.apply_stun(0, Some(2_000)); // ends 2000
        effects.apply_stun(1_000, Some(3_000)); // max(2000,1000)+3000 = 5000
        assert_eq!(effects.stun.unwrap().ends_at, 5_000);

        // After the stun lapsed, a new one starts from now.
        effects.apply_stun(20_000, Some(2_000));
        assert_eq!(effects.stun.unwrap().ends_at, 22_000);
    }

    #[test]
    fn slow_replaces_magnitude() {
        let mut effects = EffectManager::new();
        effects.apply_slow(0, 1.5);
        effects.apply_slow(100, 2.0);
        assert_eq!(effects.slow_multiplier(200), 2.0, "Latest slow wins");

        effects.apply_slow(300, 1.2);
        assert_eq!(effects.slow_multiplier(400), 1.2, "Weaker reapply still replaces");
    }

    #[test]
    fn slow_expires_after_fifteen_seconds() {
        let mut effects = EffectManager::new();
        effects.apply_slow(0, 1.8);
        assert_eq!(effects.slow_multiplier(14_999), 1.8);
        assert_eq!(effects.slow_multiplier(15_000), 1.0);

        let outcome = effects.tick(15_000);
        assert_eq!(outcome.expired, vec!["slow"]);
    }

    #[test]
    fn bleed_ticks_and_staunches_with_movement() {
        let mut effects = EffectManager::new();
        effects.apply_bleed(0);
        assert_eq!(effects.tick(3_000).damage, 5);

        effects.on_movement();
        effects.on_movement();
        assert_eq!(effects.tick(6_000).damage, 3);

        for _ in 0..5 {
            effects.on_movement();
        }
        // Damage staunched to zero: the bleed is gone at the next tick.
        let outcome = effects.tick(9_000);
        assert_eq!(outcome.damage, 0);
        assert_eq!(outcome.expired, vec!["bleed"]);
        assert!(effects.bleed.is_none());
    }

    #[test]
    fn bleed_expires_after_duration() {
        let mut effects = EffectManager::new();
        effects.apply_bleed(0);
        let outcome = effects.tick(20_000);
        assert_eq!(outcome.expired, vec!["bleed"]);
        assert_eq!(outcome.damage, 0);
    }

    #[test]
    fn stat_modifiers_flat_before_percent() {
        let mut effects = EffectManager::new();
        effects.add_modifier(StatModifier {
            stat: "strength".to_string(),
            value: 10.0,
            is_percent: false,
            duration: 60_000,
            applied_at: 0,
        });
        effects.add_modifier(StatModifier {
            stat: "strength".to_string(),
            value: 50.0,
            is_percent: true,
            duration: 60_000,
            applied_at: 0,
        });
        // (100 + 10) * 1.5
        assert_eq!(effects.calculate_stat("strength", 100.0, 1_000), 165.0);
        // Other stats are untouched.
        assert_eq!(effects.calculate_stat("agility", 100.0, 1_000), 100.0);
    }

    #[test]
    fn expired_modifiers_are_ignored_and_compacted() {
        let mut effects = EffectManager::new();
        effects.add_modifier(StatModifier {
            stat: "armor".to_string(),
            value: 20.0,
            is_percent: false,
            duration: 5_000,
            applied_at: 0,
        });
        assert_eq!(effects.calculate_stat("armor", 10.0, 4_999), 30.0);
        assert_eq!(effects.calculate_stat("armor", 10.0, 5_000), 10.0);

        effects.tick(5_000);
        assert!(effects.modifiers.is_empty(), "Tick compacts expired modifiers");
    }

    #[test]
    fn combined_dots_sum_damage() {
        let mut effects = EffectManager::new();
        effects.apply_poison(0);
        effects.apply_poison(0);
        effects.apply_bleed(0);

        // Poison 6 at 5 s intervals, bleed 5 at 3 s intervals; at 15 s both
        // are due.
        let outcome = effects.tick(15_000);
        assert_eq!(outcome.damage, 6 + 5);
    }
}
