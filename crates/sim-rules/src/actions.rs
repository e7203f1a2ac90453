//! Data-driven player actions.

use crate::error::{CatalogLoadError, RequirementFailure};
use crate::ledger::{AppliedDelta, Costs, Effects};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{GameState, MessageCategory, NotificationSink, Resource};
use sim_econ::FundingSource;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// Display metadata for an action category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// Preconditions checked before costs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Requirements {
    pub min_turn: u32,
    pub min_employees: BTreeMap<String, i64>,
}

/// Player-facing texts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionMessages {
    pub success: Option<String>,
    pub failure: Option<String>,
}

/// One validated catalog entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionDefinition {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub costs: Costs,
    pub effects: Effects,
    pub requirements: Requirements,
    pub messages: ActionMessages,
    pub sound: Option<String>,
    /// Set for funding-type actions; their money gains follow the economy.
    pub funding_source: Option<FundingSource>,
}

#[derive(Deserialize)]
struct RawRequirements {
    #[serde(default)]
    min_turn: u32,
    #[serde(default)]
    min_employees: BTreeMap<String, i64>,
}

#[derive(Deserialize)]
struct RawMessages {
    #[serde(default)]
    success: Option<String>,
    #[serde(default)]
    failure: Option<String>,
}

#[derive(Deserialize)]
struct RawAction {
    name: String,
    #[serde(default)]
    description: Option<String>,
    category: String,
    #[serde(default)]
    costs: BTreeMap<String, Decimal>,
    #[serde(default)]
    effects: BTreeMap<String, Decimal>,
    #[serde(default)]
    requirements: Option<RawRequirements>,
    #[serde(default)]
    messages: Option<RawMessages>,
    #[serde(default)]
    sound: Option<String>,
    #[serde(default)]
    funding_source: Option<String>,
}

#[derive(Deserialize)]
struct RawActionFile {
    actions: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    categories: BTreeMap<String, CategoryInfo>,
}

impl ActionDefinition {
    fn from_raw(
        id: &str,
        raw: RawAction,
        categories: &BTreeMap<String, CategoryInfo>,
    ) -> Result<Self, CatalogLoadError> {
        if id.trim().is_empty() {
            return Err(CatalogLoadError::invalid(id, "empty action id"));
        }
        if raw.name.trim().is_empty() {
            return Err(CatalogLoadError::invalid(id, "empty name"));
        }
        if !categories.is_empty() && !categories.contains_key(&raw.category) {
            return Err(CatalogLoadError::invalid(
                id,
                format!("unknown category {}", raw.category),
            ));
        }
        let requirements = raw
            .requirements
            .map(|r| Requirements {
                min_turn: r.min_turn,
                min_employees: r.min_employees,
            })
            .unwrap_or_default();
        if let Some((kind, n)) = requirements.min_employees.iter().find(|(_, n)| **n < 0) {
            return Err(CatalogLoadError::invalid(
                id,
                format!("negative employee minimum {n} for {kind}"),
            ));
        }
        let funding_source = raw
            .funding_source
            .map(|s| s.parse::<FundingSource>())
            .transpose()
            .map_err(|e| CatalogLoadError::invalid(id, e.to_string()))?;
        let messages = raw
            .messages
            .map(|m| ActionMessages {
                success: m.success,
                failure: m.failure,
            })
            .unwrap_or_default();
        Ok(Self {
            id: id.to_string(),
            name: raw.name,
            description: raw.description,
            category: raw.category,
            costs: Costs::from_raw(id, &raw.costs)?,
            effects: Effects::from_raw(id, &raw.effects)?,
            requirements,
            messages,
            sound: raw.sound,
            funding_source,
        })
    }
}

/// Result of one action execution.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionOutcome {
    pub action_id: String,
    pub success: bool,
    pub message: String,
    pub failure: Option<RequirementFailure>,
    pub applied: Vec<AppliedDelta>,
    pub costs_paid: BTreeMap<Resource, Decimal>,
}

impl ActionOutcome {
    pub fn failed(action_id: &str, failure: RequirementFailure) -> Self {
        Self {
            action_id: action_id.to_string(),
            success: false,
            message: failure.to_string(),
            failure: Some(failure),
            applied: Vec::new(),
            costs_paid: BTreeMap::new(),
        }
    }
}

/// Immutable table of actions in file order. Safe to share across sessions.
#[derive(Clone, Debug, Default)]
pub struct ActionCatalog {
    actions: Vec<ActionDefinition>,
    index: HashMap<String, usize>,
    categories: BTreeMap<String, CategoryInfo>,
}

impl ActionCatalog {
    /// Load from a JSON file. Missing or malformed files are fatal.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json_str(&text)?;
        info!(path = %path.display(), actions = catalog.len(), "loaded action catalog");
        Ok(catalog)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, CatalogLoadError> {
        let file: RawActionFile = serde_json::from_str(text)?;
        let mut actions = Vec::with_capacity(file.actions.len());
        let mut index = HashMap::with_capacity(file.actions.len());
        for (id, value) in file.actions {
            let raw: RawAction = serde_json::from_value(value)
                .map_err(|e| CatalogLoadError::invalid(&id, e.to_string()))?;
            let def = ActionDefinition::from_raw(&id, raw, &file.categories)?;
            index.insert(id, actions.len());
            actions.push(def);
        }
        Ok(Self {
            actions,
            index,
            categories: file.categories,
        })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Definition for `id`, if present.
    pub fn get(&self, id: &str) -> Option<&ActionDefinition> {
        self.index.get(id).map(|&i| &self.actions[i])
    }

    /// All definitions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.iter()
    }

    pub fn categories(&self) -> &BTreeMap<String, CategoryInfo> {
        &self.categories
    }

    /// Check requirements in fixed order: existence, turn, employee
    /// minimums, then costs. The first failure wins.
    pub fn check_requirements(
        &self,
        id: &str,
        state: &GameState,
    ) -> Result<(), RequirementFailure> {
        let def = self
            .get(id)
            .ok_or_else(|| RequirementFailure::UnknownAction(id.to_string()))?;
        if state.turn < def.requirements.min_turn {
            return Err(RequirementFailure::TooEarly {
                required: def.requirements.min_turn,
                current: state.turn,
            });
        }
        for (kind, &required) in &def.requirements.min_employees {
            let have = state.employee_count(kind);
            if have < required {
                return Err(RequirementFailure::MissingEmployees {
                    kind: kind.clone(),
                    required,
                    have,
                });
            }
        }
        match def.costs.first_shortfall(state) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    /// Ids whose requirements currently pass, in catalog order.
    pub fn list_available(&self, state: &GameState) -> Vec<&str> {
        if state.game_over {
            return Vec::new();
        }
        self.actions
            .iter()
            .filter(|a| self.check_requirements(&a.id, state).is_ok())
            .map(|a| a.id.as_str())
            .collect()
    }

    /// Execute `id` against `state`. All costs and effects apply, or none do.
    pub fn execute(
        &self,
        id: &str,
        state: &mut GameState,
        sink: &mut dyn NotificationSink,
    ) -> ActionOutcome {
        self.execute_scaled(id, state, sink, Decimal::ONE)
    }

    /// As [`ActionCatalog::execute`], scaling positive money effects by
    /// `money_multiplier`.
    pub fn execute_scaled(
        &self,
        id: &str,
        state: &mut GameState,
        sink: &mut dyn NotificationSink,
        money_multiplier: Decimal,
    ) -> ActionOutcome {
        let checked = if state.game_over {
            Err(RequirementFailure::GameOver)
        } else {
            self.check_requirements(id, state)
        };
        let def = match (checked, self.get(id)) {
            (Ok(()), Some(def)) => def,
            (Err(failure), def) => {
                let outcome = ActionOutcome::failed(id, failure);
                let text = match def.and_then(|d| d.messages.failure.as_deref()) {
                    Some(prefix) => format!("{prefix} ({})", outcome.message),
                    None => outcome.message.clone(),
                };
                warn!(action = id, reason = %outcome.message, "action rejected");
                sink.display_message(&text, MessageCategory::Warning);
                return outcome;
            }
            (Ok(()), None) => {
                return ActionOutcome::failed(id, RequirementFailure::UnknownAction(id.into()))
            }
        };

        let costs_paid = def.costs.deduct(state);
        let applied = def.effects.apply(state, money_multiplier);
        let message = def
            .messages
            .success
            .clone()
            .unwrap_or_else(|| format!("{} complete.", def.name));
        debug!(action = id, ?costs_paid, turn = state.turn, "action executed");

        sink.display_message(&message, MessageCategory::Success);
        if let Some(tag) = &def.sound {
            sink.play_sound(tag);
        }
        sink.refresh(state);

        ActionOutcome {
            action_id: id.to_string(),
            success: true,
            message,
            failure: None,
            applied,
            costs_paid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::RecordingSink;

    const CATALOG: &str = r#"{
        "actions": {
            "hire_safety_researcher": {
                "name": "Hire Safety Researcher",
                "category": "hiring",
                "costs": {"money": 50000},
                "effects": {"safety": 2, "employees.safety_researchers": 1},
                "messages": {"success": "Hired a safety researcher."},
                "sound": "hire"
            },
            "publish_paper": {
                "name": "Publish Paper",
                "category": "research",
                "costs": {"compute": 10},
                "effects": {"reputation": 3},
                "requirements": {"min_turn": 3, "min_employees": {"safety_researchers": 1}}
            },
            "raise_series_a": {
                "name": "Raise Series A",
                "category": "funding",
                "effects": {"money": 100000},
                "funding_source": "venture"
            }
        },
        "categories": {
            "hiring": {"displayName": "Hiring"},
            "research": {"displayName": "Research"},
            "funding": {"displayName": "Funding"}
        }
    }"#;

    fn catalog() -> ActionCatalog {
        ActionCatalog::from_json_str(CATALOG).unwrap()
    }

    fn fresh() -> GameState {
        GameState {
            money: Decimal::from(100_000),
            compute: Decimal::from(100),
            ..GameState::default()
        }
    }

    #[test]
    fn hire_safety_researcher_scenario() {
        let cat = catalog();
        let mut state = fresh();
        let mut sink = RecordingSink::new();
        let out = cat.execute("hire_safety_researcher", &mut state, &mut sink);
        assert!(out.success);
        assert_eq!(state.money, Decimal::from(50_000));
        assert_eq!(state.safety, Decimal::TWO);
        assert_eq!(state.employee_count("safety_researchers"), 1);
        assert_eq!(out.costs_paid[&Resource::Money], Decimal::from(50_000));
        assert_eq!(sink.texts(), vec!["Hired a safety researcher."]);
        assert_eq!(sink.sounds, vec!["hire".to_string()]);
        assert_eq!(sink.employee_updates.len(), 1);
    }

    #[test]
    fn failed_execution_leaves_state_unchanged() {
        let cat = catalog();
        let mut state = fresh();
        state.money = Decimal::from(20_000);
        let before = state.clone();
        let mut sink = RecordingSink::new();
        let out = cat.execute("hire_safety_researcher", &mut state, &mut sink);
        assert!(!out.success);
        assert_eq!(out.message, "Need $50,000 (have $20,000)");
        assert_eq!(state, before);
        assert_eq!(sink.messages[0].category, MessageCategory::Warning);
        assert!(sink.resource_updates.is_empty());
    }

    #[test]
    fn requirement_order_is_turn_then_employees_then_costs() {
        let cat = catalog();
        let mut state = fresh();
        state.compute = Decimal::ZERO;
        // Everything fails: turn wins.
        assert!(matches!(
            cat.check_requirements("publish_paper", &state),
            Err(RequirementFailure::TooEarly { required: 3, current: 0 })
        ));
        state.turn = 3;
        assert!(matches!(
            cat.check_requirements("publish_paper", &state),
            Err(RequirementFailure::MissingEmployees { .. })
        ));
        state.employees.insert("safety_researchers".into(), 1);
        assert!(matches!(
            cat.check_requirements("publish_paper", &state),
            Err(RequirementFailure::InsufficientResource {
                resource: Resource::Compute,
                ..
            })
        ));
        state.compute = Decimal::TEN;
        assert!(cat.check_requirements("publish_paper", &state).is_ok());
    }

    #[test]
    fn unknown_action_is_a_failed_result() {
        let cat = catalog();
        let mut state = fresh();
        let out = cat.execute("summon_agi", &mut state, &mut sink());
        assert!(!out.success);
        assert_eq!(
            out.failure,
            Some(RequirementFailure::UnknownAction("summon_agi".into()))
        );
    }

    #[test]
    fn game_over_blocks_execution() {
        let cat = catalog();
        let mut state = fresh();
        state.end_game(false, "out of money");
        let before = state.clone();
        let out = cat.execute("raise_series_a", &mut state, &mut sink());
        assert_eq!(out.failure, Some(RequirementFailure::GameOver));
        assert_eq!(state, before);
        assert!(cat.list_available(&state).is_empty());
    }

    #[test]
    fn list_available_follows_catalog_order() {
        let cat = catalog();
        let state = fresh();
        assert_eq!(
            cat.list_available(&state),
            vec!["hire_safety_researcher", "raise_series_a"]
        );
    }

    #[test]
    fn scaled_execution_multiplies_money_gain() {
        let cat = catalog();
        let mut state = fresh();
        let out = cat.execute_scaled("raise_series_a", &mut state, &mut sink(), Decimal::new(5, 1));
        assert!(out.success);
        assert_eq!(state.money, Decimal::from(150_000));
        assert_eq!(
            cat.get("raise_series_a").unwrap().funding_source,
            Some(FundingSource::Venture)
        );
    }

    #[test]
    fn load_rejects_bad_entries() {
        let bad_path = r#"{"actions": {"a": {"name": "A", "category": "x", "effects": {"doom": 1}}}}"#;
        assert!(matches!(
            ActionCatalog::from_json_str(bad_path),
            Err(CatalogLoadError::Invalid { .. })
        ));
        let bad_category = r#"{"actions": {"a": {"name": "A", "category": "x"}},
                               "categories": {"y": {"displayName": "Y"}}}"#;
        assert!(ActionCatalog::from_json_str(bad_category).is_err());
        let bad_source =
            r#"{"actions": {"a": {"name": "A", "category": "x", "funding_source": "lottery"}}}"#;
        assert!(ActionCatalog::from_json_str(bad_source).is_err());
        assert!(matches!(
            ActionCatalog::from_json_str("{not json"),
            Err(CatalogLoadError::Json(_))
        ));
        assert!(matches!(
            ActionCatalog::from_path("/definitely/missing/actions.json"),
            Err(CatalogLoadError::Io { .. })
        ));
    }

    fn sink() -> RecordingSink {
        RecordingSink::new()
    }

    proptest! {
        #[test]
        fn execution_is_all_or_nothing(cents in 0i64..12_000_000, turn in 0u32..6) {
            let cat = catalog();
            let mut state = fresh();
            state.money = Decimal::new(cents, 2);
            state.turn = turn;
            for id in ["hire_safety_researcher", "publish_paper"] {
                let before = state.clone();
                let ok = cat.check_requirements(id, &state).is_ok();
                let out = cat.execute(id, &mut state, &mut sink());
                prop_assert_eq!(out.success, ok);
                if !ok {
                    prop_assert_eq!(&state, &before);
                }
            }
        }
    }
}
