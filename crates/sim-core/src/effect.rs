//! Closed set of addressable state fields.
//!
//! Catalog data names mutation targets with dotted paths such as
//! `"money"` or `"employees.safety_researchers"`. Paths are parsed once at
//! load time into [`EffectTarget`] values; nothing resolves field names at
//! execution time.

use crate::state::GameState;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Numeric resources that can be spent as costs and read by conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Cash in USD.
    Money,
    /// Compute units on hand.
    Compute,
    /// Accumulated safety research.
    Safety,
    /// Accumulated capabilities research.
    Capabilities,
    /// Public and investor standing; gates funding sources.
    Reputation,
}

impl Resource {
    /// All resources in display order.
    pub const ALL: [Resource; 5] = [
        Resource::Money,
        Resource::Compute,
        Resource::Safety,
        Resource::Capabilities,
        Resource::Reputation,
    ];

    /// Field name used in catalog data.
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Money => "money",
            Resource::Compute => "compute",
            Resource::Safety => "safety",
            Resource::Capabilities => "capabilities",
            Resource::Reputation => "reputation",
        }
    }

    /// Render an amount of this resource for player-facing text.
    pub fn format(self, amount: Decimal) -> String {
        match self {
            Resource::Money => crate::format_money(amount),
            _ => format!("{} {}", crate::format_amount(amount), self.as_str()),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = EffectPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "money" => Ok(Resource::Money),
            "compute" => Ok(Resource::Compute),
            "safety" => Ok(Resource::Safety),
            "capabilities" => Ok(Resource::Capabilities),
            "reputation" => Ok(Resource::Reputation),
            other => Err(EffectPathError::UnknownResource(other.to_string())),
        }
    }
}

/// Errors produced while parsing a dotted effect path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EffectPathError {
    /// Path is empty or has an empty segment.
    #[error("empty effect path segment in {0:?}")]
    EmptySegment(String),
    /// First segment does not name an addressable field.
    #[error("unknown effect target: {0}")]
    UnknownTarget(String),
    /// Name is not a cost resource.
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    /// Path nests deeper than the target supports.
    #[error("effect path too deep: {0}")]
    TooDeep(String),
}

/// A mutation target addressable from catalog data.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EffectTarget {
    /// One of the numeric resources.
    Resource(Resource),
    /// Compute lost per turn.
    ComputeRate,
    /// Upkeep per employee per turn.
    StaffMaintenanceCost,
    /// Head count for one employee type (create-or-increment).
    Employees(String),
    /// Membership in the upgrade set: positive deltas insert, negative remove.
    Upgrade(String),
}

impl EffectTarget {
    /// Parse a dotted path such as `"employees.safety_researchers"`.
    pub fn parse(path: &str) -> Result<Self, EffectPathError> {
        let mut parts = path.split('.');
        let head = parts.next().unwrap_or_default();
        if head.is_empty() {
            return Err(EffectPathError::EmptySegment(path.to_string()));
        }
        let key = parts.next();
        if parts.next().is_some() {
            return Err(EffectPathError::TooDeep(path.to_string()));
        }
        match (head, key) {
            (_, Some("")) => Err(EffectPathError::EmptySegment(path.to_string())),
            ("employees", Some(kind)) => Ok(EffectTarget::Employees(kind.to_string())),
            ("upgrades", Some(name)) => Ok(EffectTarget::Upgrade(name.to_string())),
            ("employees" | "upgrades", None) => {
                Err(EffectPathError::EmptySegment(path.to_string()))
            }
            (_, Some(_)) => Err(EffectPathError::TooDeep(path.to_string())),
            ("compute_rate", None) => Ok(EffectTarget::ComputeRate),
            ("staff_maintenance_cost", None) => Ok(EffectTarget::StaffMaintenanceCost),
            (name, None) => name
                .parse::<Resource>()
                .map(EffectTarget::Resource)
                .map_err(|_| EffectPathError::UnknownTarget(name.to_string())),
        }
    }

    /// Whether deltas for this target must be whole numbers.
    pub fn is_counted(&self) -> bool {
        matches!(self, EffectTarget::Employees(_))
    }

    /// Current value at this target. Upgrades read as 1 when present.
    pub fn read(&self, state: &GameState) -> Decimal {
        match self {
            EffectTarget::Resource(r) => state.resource(*r),
            EffectTarget::ComputeRate => state.compute_rate,
            EffectTarget::StaffMaintenanceCost => state.staff_maintenance_cost,
            EffectTarget::Employees(kind) => Decimal::from(state.employee_count(kind)),
            EffectTarget::Upgrade(name) => {
                if state.upgrades.contains(name) {
                    Decimal::ONE
                } else {
                    Decimal::ZERO
                }
            }
        }
    }

    /// Apply `delta` to this target. Employee counts are whole numbers and
    /// never drop below zero; catalogs reject fractional head-count deltas
    /// at load, so any fraction reaching here is truncated.
    pub fn apply(&self, state: &mut GameState, delta: Decimal) {
        match self {
            EffectTarget::Resource(r) => {
                let v = state.resource(*r).saturating_add(delta);
                state.set_resource(*r, v);
            }
            EffectTarget::ComputeRate => {
                state.compute_rate = state.compute_rate.saturating_add(delta)
            }
            EffectTarget::StaffMaintenanceCost => {
                state.staff_maintenance_cost = state.staff_maintenance_cost.saturating_add(delta)
            }
            EffectTarget::Employees(kind) => {
                let step = delta.trunc().to_i64().unwrap_or(if delta.is_sign_negative() {
                    i64::MIN
                } else {
                    i64::MAX
                });
                let count = state.employees.entry(kind.clone()).or_insert(0);
                *count = count.saturating_add(step).max(0);
            }
            EffectTarget::Upgrade(name) => {
                if delta > Decimal::ZERO {
                    state.upgrades.insert(name.clone());
                } else if delta < Decimal::ZERO {
                    state.upgrades.remove(name);
                }
            }
        }
    }
}

impl fmt::Display for EffectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectTarget::Resource(r) => f.write_str(r.as_str()),
            EffectTarget::ComputeRate => f.write_str("compute_rate"),
            EffectTarget::StaffMaintenanceCost => f.write_str("staff_maintenance_cost"),
            EffectTarget::Employees(kind) => write!(f, "employees.{kind}"),
            EffectTarget::Upgrade(name) => write!(f, "upgrades.{name}"),
        }
    }
}
