//! Mutable session state.

use crate::config::SimConfig;
use crate::effect::Resource;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A long-running research project tracked on the state record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Completion fraction in [0, 1].
    pub progress: f64,
    /// Turns until completion.
    pub turns_remaining: u32,
}

/// The complete simulation state of one session.
///
/// The record serializes to plain nested primitives, which is what the
/// persistence layer stores. Once `game_over` is set, callers must not
/// apply gameplay mutations; the rules and turn code enforce this.
/// Resource quantities and rates are fixed-point decimals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Turn counter, monotonic from 0.
    pub turn: u32,
    /// Cash in USD. May go negative at end of turn before terminal checks.
    pub money: Decimal,
    /// Compute units on hand.
    pub compute: Decimal,
    /// Accumulated safety research.
    pub safety: Decimal,
    /// Accumulated capabilities research.
    pub capabilities: Decimal,
    /// Standing with funders and the public.
    #[serde(default)]
    pub reputation: Decimal,
    /// Head count by employee type.
    pub employees: BTreeMap<String, i64>,
    /// Purchased upgrades.
    pub upgrades: BTreeSet<String>,
    /// Active projects in start order.
    pub active_projects: Vec<Project>,
    /// Session seed string.
    pub seed: String,
    /// Compute consumed per turn.
    pub compute_rate: Decimal,
    /// Upkeep per employee per turn.
    pub staff_maintenance_cost: Decimal,
    /// Terminal flag.
    pub game_over: bool,
    /// Set together with `game_over` when the lab wins.
    pub victory: bool,
    /// Why the game ended, if it has.
    #[serde(default)]
    pub game_over_reason: Option<String>,
}

impl GameState {
    /// Fresh state for a new session using the configured starting values.
    /// `seed` overrides the configured seed when provided.
    pub fn new(config: &SimConfig, seed: Option<&str>) -> Self {
        Self {
            money: config.starting_money,
            compute: config.starting_compute,
            safety: config.starting_safety,
            capabilities: config.starting_capabilities,
            reputation: config.starting_reputation,
            employees: config.starting_employees.clone(),
            seed: seed.unwrap_or(&config.seed).to_string(),
            compute_rate: config.compute_rate,
            staff_maintenance_cost: config.staff_maintenance_cost,
            ..Self::default()
        }
    }

    /// Read a numeric resource.
    pub fn resource(&self, r: Resource) -> Decimal {
        match r {
            Resource::Money => self.money,
            Resource::Compute => self.compute,
            Resource::Safety => self.safety,
            Resource::Capabilities => self.capabilities,
            Resource::Reputation => self.reputation,
        }
    }

    /// Overwrite a numeric resource.
    pub fn set_resource(&mut self, r: Resource, value: Decimal) {
        match r {
            Resource::Money => self.money = value,
            Resource::Compute => self.compute = value,
            Resource::Safety => self.safety = value,
            Resource::Capabilities => self.capabilities = value,
            Resource::Reputation => self.reputation = value,
        }
    }

    /// Head count of one employee type; absent types count as zero.
    pub fn employee_count(&self, kind: &str) -> i64 {
        self.employees.get(kind).copied().unwrap_or(0)
    }

    /// Head count across all employee types.
    pub fn total_employees(&self) -> i64 {
        self.employees.values().sum()
    }

    /// Mark the session finished.
    pub fn end_game(&mut self, victory: bool, reason: impl Into<String>) {
        self.game_over = true;
        self.victory = victory;
        self.game_over_reason = Some(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_uses_config() {
        let cfg = SimConfig::default();
        let s = GameState::new(&cfg, Some("abc"));
        assert_eq!(s.turn, 0);
        assert_eq!(s.money, cfg.starting_money);
        assert_eq!(s.seed, "abc");
        assert!(!s.game_over);
    }

    #[test]
    fn total_employees_sums_types() {
        let mut s = GameState::default();
        s.employees.insert("safety_researchers".into(), 2);
        s.employees.insert("engineers".into(), 3);
        assert_eq!(s.total_employees(), 5);
        assert_eq!(s.employee_count("managers"), 0);
    }

    #[test]
    fn resources_read_back_exactly() {
        let mut s = GameState::default();
        for _ in 0..10 {
            let v = s.resource(Resource::Money) + Decimal::new(1, 1);
            s.set_resource(Resource::Money, v);
        }
        assert_eq!(s.money, Decimal::ONE);
    }

    #[test]
    fn serde_roundtrip_is_lossless() {
        let mut s = GameState::new(&SimConfig::default(), None);
        s.upgrades.insert("better_gpus".into());
        s.active_projects.push(Project {
            id: "interp".into(),
            name: "Interpretability sprint".into(),
            progress: 0.25,
            turns_remaining: 6,
        });
        s.money = Decimal::new(-123_456_78, 2);
        s.end_game(false, "out of money");
        let json = serde_json::to_string(&s).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
