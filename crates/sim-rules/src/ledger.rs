//! Costs and effects shared by actions and event options.
//!
//! Both are validated once at load: cost keys must be numeric resources and
//! effect keys must parse into an [`EffectTarget`]. Application is split in
//! two steps so callers can check affordability before touching state.
//! Amounts are exact decimals.

use crate::error::{CatalogLoadError, RequirementFailure};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use sim_core::{EffectTarget, GameState, Resource};
use std::collections::BTreeMap;

/// Resource costs, checked and deducted in resource order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Costs(BTreeMap<Resource, Decimal>);

impl Costs {
    pub(crate) fn from_raw(
        id: &str,
        raw: &BTreeMap<String, Decimal>,
    ) -> Result<Self, CatalogLoadError> {
        let mut out = BTreeMap::new();
        for (key, amount) in raw {
            let resource: Resource = key
                .parse()
                .map_err(|e| CatalogLoadError::invalid(id, format!("cost {key}: {e}")))?;
            if amount.is_sign_negative() && !amount.is_zero() {
                return Err(CatalogLoadError::invalid(
                    id,
                    format!("cost {key} must be >= 0"),
                ));
            }
            out.insert(resource, *amount);
        }
        Ok(Self(out))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, Decimal)> + '_ {
        self.0.iter().map(|(r, a)| (*r, *a))
    }

    /// First resource whose balance does not cover its cost.
    pub fn first_shortfall(&self, state: &GameState) -> Option<RequirementFailure> {
        self.iter().find_map(|(resource, need)| {
            let have = state.resource(resource);
            (have < need).then_some(RequirementFailure::InsufficientResource {
                resource,
                need,
                have,
            })
        })
    }

    /// Deduct every cost. Callers must check [`Costs::first_shortfall`] first.
    pub(crate) fn deduct(&self, state: &mut GameState) -> BTreeMap<Resource, Decimal> {
        for (resource, amount) in self.iter() {
            let v = state.resource(resource).saturating_sub(amount);
            state.set_resource(resource, v);
        }
        self.0.clone()
    }
}

/// One applied effect, with the value before and after.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppliedDelta {
    pub target: String,
    pub delta: Decimal,
    pub before: Decimal,
    pub after: Decimal,
}

/// Effects in target order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Effects(Vec<(EffectTarget, Decimal)>);

impl Effects {
    pub(crate) fn from_raw(
        id: &str,
        raw: &BTreeMap<String, Decimal>,
    ) -> Result<Self, CatalogLoadError> {
        let mut out = Vec::with_capacity(raw.len());
        for (path, delta) in raw {
            let target = EffectTarget::parse(path)
                .map_err(|e| CatalogLoadError::invalid(id, format!("effect {path}: {e}")))?;
            if target.is_counted() && !delta.fract().is_zero() {
                return Err(CatalogLoadError::invalid(
                    id,
                    format!("effect {path} must be a whole number, got {delta}"),
                ));
            }
            out.push((target, *delta));
        }
        Ok(Self(out))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(EffectTarget, Decimal)> {
        self.0.iter()
    }

    /// Apply every effect. Positive money deltas are scaled by
    /// `money_multiplier` and rounded to whole cents.
    pub(crate) fn apply(
        &self,
        state: &mut GameState,
        money_multiplier: Decimal,
    ) -> Vec<AppliedDelta> {
        self.0
            .iter()
            .map(|(target, delta)| {
                let delta = match target {
                    EffectTarget::Resource(Resource::Money) if *delta > Decimal::ZERO => delta
                        .saturating_mul(money_multiplier)
                        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
                    _ => *delta,
                };
                let before = target.read(state);
                target.apply(state, delta);
                AppliedDelta {
                    target: target.to_string(),
                    delta,
                    before,
                    after: target.read(state),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn costs_reject_unknown_resources_and_negatives() {
        assert!(Costs::from_raw("a", &raw(&[("doom", Decimal::ONE)])).is_err());
        assert!(Costs::from_raw("a", &raw(&[("money", Decimal::NEGATIVE_ONE)])).is_err());
        assert!(Costs::from_raw("a", &raw(&[("money", Decimal::ZERO)])).is_ok());
    }

    #[test]
    fn shortfall_reports_first_resource_in_order() {
        let costs = Costs::from_raw(
            "a",
            &raw(&[("money", Decimal::TEN), ("compute", Decimal::from(5))]),
        )
        .unwrap();
        let state = GameState::default();
        // Money sorts before compute in resource order.
        assert!(matches!(
            costs.first_shortfall(&state),
            Some(RequirementFailure::InsufficientResource {
                resource: Resource::Money,
                ..
            })
        ));
    }

    #[test]
    fn repeated_fractional_costs_deduct_exactly() {
        let costs = Costs::from_raw("a", &raw(&[("money", Decimal::new(10, 2))])).unwrap();
        let mut state = GameState {
            money: Decimal::from(3),
            ..GameState::default()
        };
        for _ in 0..30 {
            assert!(costs.first_shortfall(&state).is_none());
            costs.deduct(&mut state);
        }
        assert_eq!(state.money, Decimal::ZERO);
        assert!(costs.first_shortfall(&state).is_some());
    }

    #[test]
    fn effects_scale_only_positive_money() {
        let effects = Effects::from_raw(
            "a",
            &raw(&[("money", Decimal::from(1_000)), ("safety", Decimal::TWO)]),
        )
        .unwrap();
        let mut state = GameState::default();
        let applied = effects.apply(&mut state, Decimal::new(15, 1));
        assert_eq!(state.money, Decimal::from(1_500));
        assert_eq!(state.safety, Decimal::TWO);
        assert_eq!(applied[0].before, Decimal::ZERO);
        assert_eq!(applied[0].after, Decimal::from(1_500));
    }

    #[test]
    fn scaled_money_rounds_to_cents() {
        let effects = Effects::from_raw("a", &raw(&[("money", Decimal::from(1_000))])).unwrap();
        let mut state = GameState::default();
        let applied = effects.apply(&mut state, Decimal::new(1_234_567, 6));
        assert_eq!(applied[0].delta, Decimal::new(1_234_57, 2));
        assert_eq!(state.money, Decimal::new(1_234_57, 2));
    }

    #[test]
    fn bad_effect_path_fails_load() {
        let err = Effects::from_raw("a", &raw(&[("employees.", Decimal::ONE)])).unwrap_err();
        assert!(matches!(err, CatalogLoadError::Invalid { .. }));
    }

    #[test]
    fn fractional_head_count_fails_load() {
        let err = Effects::from_raw("a", &raw(&[("employees.engineers", Decimal::new(5, 1))]))
            .unwrap_err();
        assert!(err.to_string().contains("whole number"));
        let whole = raw(&[("employees.engineers", Decimal::new(-20, 1))]);
        assert!(Effects::from_raw("a", &whole).is_ok());
        let rate = raw(&[("compute_rate", Decimal::new(5, 1))]);
        assert!(Effects::from_raw("a", &rate).is_ok());
    }
}
