use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Combat lifecycle states. `Defeated` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatState {
    Idle,
    InCombat,
    Fleeing,
    Defeated,
}

impl CombatState {
    /// Permitted transitions. Identity transitions are always valid.
    pub fn can_transition_to(self, to: CombatState) -> bool {
        if self == to {
            return true;
        }
        matches!(
            (self, to),
            (CombatState::Idle, CombatState::InCombat)
                | (CombatState::InCombat, CombatState::Idle)
                | (CombatState::InCombat, CombatState::Fleeing)
                | (CombatState::InCombat, CombatState::Defeated)
                | (CombatState::Fleeing, CombatState::InCombat)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub entity_id: u64,
    pub combat_state: CombatState,
    pub current_hp: i32,
}

impl Combatant {
    pub fn new(entity_id: u64, hp: i32) -> Self {
        Self {
            entity_id,
            combat_state: CombatState::Idle,
            current_hp: hp,
        }
    }

    /// Attempt a state transition. Invalid transitions fail without
    /// changing state.
    pub fn transition(&mut self, to: CombatState) -> Result<(), WorldError> {
        if !self.combat_state.can_transition_to(to) {
            return Err(WorldError::invariant(format!(
                "entity {}: invalid combat transition {:?} -> {:?}",
                self.entity_id, self.combat_state, to
            )));
        }
        self.combat_state = to;
        Ok(())
    }
}

/// Combat actions with distinct wind-up times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatAction {
    Quick,
    Normal,
    Heavy,
    Defend,
    Flee,
    UseItem,
}

impl CombatAction {
    pub fn base_reaction_ms(self) -> f64 {
        match self {
            CombatAction::Quick => 800.0,
            CombatAction::Normal => 1000.0,
            CombatAction::Heavy => 1500.0,
            CombatAction::Defend => 500.0,
            CombatAction::Flee => 2000.0,
            CombatAction::UseItem => 700.0,
        }
    }
}

/// Speed-affecting statuses: haste accelerates, slows can only delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedStatus {
    Haste,
    Slowed(f64),
}

impl SpeedStatus {
    fn factor(self) -> f64 {
        match self {
            SpeedStatus::Haste => 0.7,
            SpeedStatus::Slowed(multiplier) => multiplier.max(1.0),
        }
    }
}

/// Reaction time in milliseconds for an action: the base time reduced by
/// agility (capped at 30%), multiplied by status factors, floored at
/// 200 ms.
pub fn reaction_time_ms(action: CombatAction, agility: f64, statuses: &[SpeedStatus]) -> f64 {
    let agility_factor = 1.0 - (agility.clamp(0.0, 100.0) / 100.0) * 0.3;
    let mut time = action.base_reaction_ms() * agility_factor;
    for status in statuses {
        time *= status.factor();
    }
    time.max(200.0)
}

/// Advance one combat tick over a set of combatants. Each combatant's
/// effect manager runs its expirations before any damage lands, the
/// damage is applied to hit points, and a combatant dropping to zero in
/// combat is moved to `Defeated`. Combatants never couple to each other
/// within a tick.
pub fn combat_tick(
    combatants: &mut [(Combatant, crate::runtime::effects::EffectManager)],
    now: crate::runtime::effects::Millis,
) -> Vec<(u64, crate::runtime::effects::TickOutcome)> {
    let mut outcomes = Vec::with_capacity(combatants.len());
    for (combatant, effects) in combatants.iter_mut() {
        let outcome = effects.tick(now);
        if outcome.damage > 0 && combatant.combat_state != CombatState::Defeated {
            combatant.current_hp = (combatant.current_hp - outcome.damage).max(0);
            if combatant.current_hp == 0 && combatant.combat_state == CombatState::InCombat {
                let _ = combatant.transition(CombatState::Defeated);
            }
        }
        outcomes.push((combatant.entity_id, outcome));
    }
    outcomes
}
