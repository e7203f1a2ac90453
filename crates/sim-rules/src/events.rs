//! Data-driven random and scripted events.
//!
//! [`EventCatalog`] is immutable after load and shared between sessions.
//! Per-session trigger history lives in [`EventTracker`].

use crate::error::{CatalogLoadError, EventFailure};
use crate::ledger::{AppliedDelta, Costs, Effects};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{Condition, GameState, MessageCategory, NotificationSink, Resource, RngService};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// Display metadata for an event type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeInfo {
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

/// Whether an event applies immediately or waits for a choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Normal,
    Popup,
}

impl EventKind {
    fn as_str(self) -> &'static str {
        match self {
            EventKind::Normal => "normal",
            EventKind::Popup => "popup",
        }
    }
}

/// When an event fires.
#[derive(Clone, Debug, PartialEq)]
pub enum Trigger {
    /// On exactly `turn`, if the condition holds.
    TurnAndResource {
        turn: u32,
        condition: Option<Condition>,
    },
    /// Whenever the condition holds.
    Threshold { condition: Condition },
    /// From `min_turn` onward, if the condition holds.
    TurnThreshold {
        min_turn: u32,
        condition: Option<Condition>,
    },
    /// From `min_turn` onward, with `probability` per turn.
    Random { min_turn: u32, probability: f64 },
    /// Unrecognized trigger type. Never fires.
    Unknown(String),
}

/// A choice offered by a popup event.
#[derive(Clone, Debug, PartialEq)]
pub struct EventOption {
    pub id: String,
    pub text: String,
    pub costs: Costs,
    pub effects: Effects,
    pub message: String,
    pub sound: Option<String>,
}

/// The fixed effect of a normal event.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalEffect {
    pub message: String,
    pub sound: Option<String>,
    pub effects: Effects,
}

/// One validated catalog entry.
#[derive(Clone, Debug, PartialEq)]
pub struct EventDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: EventKind,
    pub repeatable: bool,
    pub trigger: Trigger,
    pub options: Vec<EventOption>,
    pub effect: Option<NormalEffect>,
}

#[derive(Deserialize, Default)]
struct RawTriggerParams {
    #[serde(default)]
    turn: Option<u32>,
    #[serde(default)]
    min_turn: Option<u32>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    probability: Option<f64>,
}

#[derive(Deserialize)]
struct RawTrigger {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    parameters: RawTriggerParams,
}

#[derive(Deserialize)]
struct RawOption {
    id: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    costs: BTreeMap<String, Decimal>,
    #[serde(default)]
    effects: BTreeMap<String, Decimal>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    sound: Option<String>,
}

#[derive(Deserialize)]
struct RawEffect {
    message: String,
    #[serde(default)]
    sound: Option<String>,
    #[serde(default)]
    effects: BTreeMap<String, Decimal>,
}

#[derive(Deserialize)]
struct RawEvent {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(default)]
    repeatable: bool,
    trigger: RawTrigger,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    effect: Option<RawEffect>,
}

#[derive(Deserialize)]
struct RawEventFile {
    events: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    event_types: BTreeMap<String, EventTypeInfo>,
}

impl Trigger {
    fn from_raw(id: &str, raw: RawTrigger) -> Result<Self, CatalogLoadError> {
        let p = raw.parameters;
        let condition = p.condition.as_deref().map(Condition::compile);
        let trigger = match raw.kind.as_str() {
            "turn_and_resource" => Trigger::TurnAndResource {
                turn: p.turn.ok_or_else(|| {
                    CatalogLoadError::invalid(id, "turn_and_resource trigger needs a turn")
                })?,
                condition,
            },
            "threshold" => Trigger::Threshold {
                condition: condition.ok_or_else(|| {
                    CatalogLoadError::invalid(id, "threshold trigger needs a condition")
                })?,
            },
            "turn_threshold" => Trigger::TurnThreshold {
                min_turn: p.min_turn.ok_or_else(|| {
                    CatalogLoadError::invalid(id, "turn_threshold trigger needs min_turn")
                })?,
                condition,
            },
            "random" => {
                let probability = p.probability.ok_or_else(|| {
                    CatalogLoadError::invalid(id, "random trigger needs a probability")
                })?;
                if !(0.0..=1.0).contains(&probability) {
                    return Err(CatalogLoadError::invalid(
                        id,
                        format!("probability {probability} outside [0, 1]"),
                    ));
                }
                Trigger::Random {
                    min_turn: p.min_turn.unwrap_or(0),
                    probability,
                }
            }
            other => {
                warn!(event = id, trigger = other, "unknown trigger type; event will never fire");
                Trigger::Unknown(other.to_string())
            }
        };
        Ok(trigger)
    }

    /// Whether the trigger holds for `event_id` in `state`. Random triggers
    /// draw from a stream keyed by event and turn, so the outcome is fixed
    /// for a given turn no matter how often it is checked.
    pub fn holds(&self, event_id: &str, state: &GameState, rng: &RngService) -> bool {
        let cond = |c: &Option<Condition>| c.as_ref().map_or(true, |c| c.evaluate(state));
        match self {
            Trigger::TurnAndResource { turn, condition } => state.turn == *turn && cond(condition),
            Trigger::Threshold { condition } => condition.evaluate(state),
            Trigger::TurnThreshold {
                min_turn,
                condition,
            } => state.turn >= *min_turn && cond(condition),
            Trigger::Random {
                min_turn,
                probability,
            } => {
                if state.turn < *min_turn {
                    return false;
                }
                use rand::Rng;
                let roll: f64 = rng
                    .fork(&format!("event:{event_id}:turn:{}", state.turn))
                    .gen();
                roll < *probability
            }
            Trigger::Unknown(_) => false,
        }
    }
}

impl EventDefinition {
    fn from_raw(
        id: &str,
        raw: RawEvent,
        event_types: &BTreeMap<String, EventTypeInfo>,
    ) -> Result<Self, CatalogLoadError> {
        if raw.name.trim().is_empty() {
            return Err(CatalogLoadError::invalid(id, "empty name"));
        }
        if !event_types.is_empty() && !event_types.contains_key(raw.kind.as_str()) {
            return Err(CatalogLoadError::invalid(
                id,
                format!("event type {} is not declared", raw.kind.as_str()),
            ));
        }
        let trigger = Trigger::from_raw(id, raw.trigger)?;
        let mut options = Vec::with_capacity(raw.options.len());
        let mut seen = BTreeSet::new();
        for o in raw.options {
            if !seen.insert(o.id.clone()) {
                return Err(CatalogLoadError::invalid(
                    id,
                    format!("duplicate option {}", o.id),
                ));
            }
            let oid = format!("{id}.{}", o.id);
            options.push(EventOption {
                text: o.text.unwrap_or_else(|| o.id.clone()),
                costs: Costs::from_raw(&oid, &o.costs)?,
                effects: Effects::from_raw(&oid, &o.effects)?,
                message: o.message.unwrap_or_default(),
                sound: o.sound,
                id: o.id,
            });
        }
        let effect = raw
            .effect
            .map(|e| -> Result<NormalEffect, CatalogLoadError> {
                Ok(NormalEffect {
                    effects: Effects::from_raw(id, &e.effects)?,
                    message: e.message,
                    sound: e.sound,
                })
            })
            .transpose()?;
        match raw.kind {
            EventKind::Popup if options.is_empty() => {
                return Err(CatalogLoadError::invalid(id, "popup event without options"))
            }
            EventKind::Normal if effect.is_none() => {
                return Err(CatalogLoadError::invalid(id, "normal event without effect"))
            }
            _ => {}
        }
        Ok(Self {
            id: id.to_string(),
            name: raw.name,
            description: raw.description,
            kind: raw.kind,
            repeatable: raw.repeatable,
            trigger,
            options,
            effect,
        })
    }

    pub fn option(&self, option_id: &str) -> Option<&EventOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// Ids of non-repeatable events that have already fired in a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventTracker {
    triggered: BTreeSet<String>,
}

impl EventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from saved ids.
    pub fn from_ids<I: IntoIterator<Item = String>>(ids: I) -> Self {
        Self {
            triggered: ids.into_iter().collect(),
        }
    }

    pub fn has_fired(&self, id: &str) -> bool {
        self.triggered.contains(id)
    }

    pub fn mark(&mut self, id: &str) {
        self.triggered.insert(id.to_string());
    }

    /// Forget every fired event (new game).
    pub fn reset(&mut self) {
        self.triggered.clear();
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.triggered.iter().map(String::as_str)
    }
}

/// Result of executing an event or one of its options.
#[derive(Clone, Debug, PartialEq)]
pub struct EventOutcome {
    pub event_id: String,
    pub option_id: Option<String>,
    pub success: bool,
    pub message: String,
    pub failure: Option<EventFailure>,
    pub applied: Vec<AppliedDelta>,
    pub costs_paid: BTreeMap<Resource, Decimal>,
}

impl EventOutcome {
    pub fn failed(event_id: &str, option_id: Option<&str>, failure: EventFailure) -> Self {
        Self {
            event_id: event_id.to_string(),
            option_id: option_id.map(str::to_string),
            success: false,
            message: failure.to_string(),
            failure: Some(failure),
            applied: Vec::new(),
            costs_paid: BTreeMap::new(),
        }
    }
}

/// Immutable table of events in file order. Safe to share across sessions.
#[derive(Clone, Debug, Default)]
pub struct EventCatalog {
    events: Vec<EventDefinition>,
    index: HashMap<String, usize>,
    event_types: BTreeMap<String, EventTypeInfo>,
}

impl EventCatalog {
    /// Load from a JSON file. Missing or malformed files are fatal.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json_str(&text)?;
        info!(path = %path.display(), events = catalog.len(), "loaded event catalog");
        Ok(catalog)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, CatalogLoadError> {
        let file: RawEventFile = serde_json::from_str(text)?;
        let mut events = Vec::with_capacity(file.events.len());
        let mut index = HashMap::with_capacity(file.events.len());
        for (id, value) in file.events {
            let raw: RawEvent = serde_json::from_value(value)
                .map_err(|e| CatalogLoadError::invalid(&id, e.to_string()))?;
            let def = EventDefinition::from_raw(&id, raw, &file.event_types)?;
            index.insert(id, events.len());
            events.push(def);
        }
        Ok(Self {
            events,
            index,
            event_types: file.event_types,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&EventDefinition> {
        self.index.get(id).map(|&i| &self.events[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventDefinition> {
        self.events.iter()
    }

    pub fn event_types(&self) -> &BTreeMap<String, EventTypeInfo> {
        &self.event_types
    }

    /// Evaluate every event once, in catalog order. Returns the ids that
    /// fired and marks the non-repeatable ones in `tracker`.
    pub fn check_all_events(
        &self,
        state: &GameState,
        rng: &RngService,
        tracker: &mut EventTracker,
    ) -> Vec<String> {
        if state.game_over {
            return Vec::new();
        }
        let mut fired = Vec::new();
        for ev in &self.events {
            if !ev.repeatable && tracker.has_fired(&ev.id) {
                continue;
            }
            if ev.trigger.holds(&ev.id, state, rng) {
                debug!(event = %ev.id, turn = state.turn, "event fired");
                if !ev.repeatable {
                    tracker.mark(&ev.id);
                }
                fired.push(ev.id.clone());
            }
        }
        fired
    }

    /// Choices offered by a popup event. Does not mutate anything.
    pub fn get_options(&self, id: &str) -> Option<&[EventOption]> {
        self.get(id)
            .filter(|e| e.kind == EventKind::Popup)
            .map(|e| e.options.as_slice())
    }

    /// Apply a normal event's declared effect. No cost check.
    pub fn execute(
        &self,
        id: &str,
        state: &mut GameState,
        sink: &mut dyn NotificationSink,
    ) -> EventOutcome {
        let Some(ev) = self.get(id) else {
            return EventOutcome::failed(id, None, EventFailure::UnknownEvent(id.to_string()));
        };
        if state.game_over {
            return EventOutcome::failed(id, None, EventFailure::GameOver);
        }
        let Some(effect) = ev.effect.as_ref().filter(|_| ev.kind == EventKind::Normal) else {
            return EventOutcome::failed(id, None, EventFailure::RequiresChoice(id.to_string()));
        };
        let applied = effect.effects.apply(state, Decimal::ONE);
        sink.display_message(&effect.message, MessageCategory::Event);
        if let Some(tag) = &effect.sound {
            sink.play_sound(tag);
        }
        if !applied.is_empty() {
            sink.refresh(state);
        }
        EventOutcome {
            event_id: id.to_string(),
            option_id: None,
            success: true,
            message: effect.message.clone(),
            failure: None,
            applied,
            costs_paid: BTreeMap::new(),
        }
    }

    /// Resolve a popup event with `option_id`. Costs then effects apply
    /// atomically; an unaffordable choice changes nothing.
    pub fn execute_choice(
        &self,
        event_id: &str,
        option_id: &str,
        state: &mut GameState,
        sink: &mut dyn NotificationSink,
    ) -> EventOutcome {
        let fail = |failure: EventFailure| EventOutcome::failed(event_id, Some(option_id), failure);
        let Some(ev) = self.get(event_id) else {
            return fail(EventFailure::UnknownEvent(event_id.to_string()));
        };
        if ev.kind != EventKind::Popup {
            return fail(EventFailure::NotPopup(event_id.to_string()));
        }
        if state.game_over {
            return fail(EventFailure::GameOver);
        }
        let Some(option) = ev.option(option_id) else {
            return fail(EventFailure::UnknownOption {
                event: event_id.to_string(),
                option: option_id.to_string(),
            });
        };
        if let Some(short) = option.costs.first_shortfall(state) {
            let out = fail(EventFailure::Unaffordable(short));
            warn!(event = event_id, option = option_id, reason = %out.message, "choice unaffordable");
            sink.display_message(
                &format!("Cannot choose \"{}\": {}", option.text, out.message),
                MessageCategory::Warning,
            );
            return out;
        }
        let costs_paid = option.costs.deduct(state);
        let applied = option.effects.apply(state, Decimal::ONE);
        let message = if option.message.is_empty() {
            format!("{}: {}", ev.name, option.text)
        } else {
            option.message.clone()
        };
        sink.display_message(&message, MessageCategory::Event);
        if let Some(tag) = &option.sound {
            sink.play_sound(tag);
        }
        sink.refresh(state);
        EventOutcome {
            event_id: event_id.to_string(),
            option_id: Some(option_id.to_string()),
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
    use sim_core::RecordingSink;

    const CATALOG: &str = r#"{
        "events": {
            "funding_crunch": {
                "name": "Funding Crunch",
                "description": "Investors are nervous.",
                "type": "popup",
                "trigger": {"type": "turn_and_resource", "parameters": {"turn": 5, "condition": "money < 50000"}},
                "options": [
                    {"id": "bridge_loan", "text": "Take a bridge loan", "costs": {"reputation": 5},
                     "effects": {"money": 30000}, "message": "The loan lands.", "sound": "coins"},
                    {"id": "layoffs", "text": "Cut staff", "effects": {"employees.engineers": -1},
                     "message": "You let an engineer go."}
                ]
            },
            "safety_milestone": {
                "name": "Safety Milestone",
                "type": "normal",
                "trigger": {"type": "threshold", "parameters": {"condition": "safety >= 20"}},
                "effect": {"message": "Your safety work is noticed.", "effects": {"reputation": 2}}
            },
            "hype_cycle": {
                "name": "Hype Cycle",
                "type": "normal",
                "repeatable": true,
                "trigger": {"type": "turn_threshold", "parameters": {"min_turn": 10}},
                "effect": {"message": "AI is in the news again.", "sound": "news"}
            },
            "gpu_shortage": {
                "name": "GPU Shortage",
                "type": "normal",
                "trigger": {"type": "random", "parameters": {"min_turn": 2, "probability": 0.5}},
                "effect": {"message": "GPUs are scarce.", "effects": {"compute": -10}}
            },
            "mystery": {
                "name": "Mystery",
                "type": "normal",
                "trigger": {"type": "lunar_phase", "parameters": {}},
                "effect": {"message": "Nothing happens."}
            },
            "broken": {
                "name": "Broken",
                "type": "normal",
                "trigger": {"type": "threshold", "parameters": {"condition": "__import__('os')"}},
                "effect": {"message": "Should never fire."}
            }
        },
        "event_types": {
            "normal": {"displayName": "Event", "description": "Happens immediately"},
            "popup": {"displayName": "Decision", "description": "Requires a choice"}
        }
    }"#;

    fn catalog() -> EventCatalog {
        EventCatalog::from_json_str(CATALOG).unwrap()
    }

    #[test]
    fn turn_and_resource_fires_on_exact_turn_only() {
        let cat = catalog();
        let rng = RngService::new("s");
        let mut tracker = EventTracker::new();
        let mut state = GameState {
            money: Decimal::from(10_000),
            turn: 4,
            ..GameState::default()
        };
        let fired = cat.check_all_events(&state, &rng, &mut tracker);
        assert!(!fired.contains(&"funding_crunch".to_string()));
        state.turn = 5;
        let fired = cat.check_all_events(&state, &rng, &mut tracker);
        assert!(fired.contains(&"funding_crunch".to_string()));
    }

    #[test]
    fn non_repeatable_event_fires_once() {
        let cat = catalog();
        let rng = RngService::new("s");
        let mut tracker = EventTracker::new();
        let state = GameState {
            safety: Decimal::from(25),
            ..GameState::default()
        };
        let first = cat.check_all_events(&state, &rng, &mut tracker);
        assert_eq!(first, vec!["safety_milestone".to_string()]);
        for _ in 0..3 {
            let again = cat.check_all_events(&state, &rng, &mut tracker);
            assert!(again.is_empty());
        }
        tracker.reset();
        assert_eq!(
            cat.check_all_events(&state, &rng, &mut tracker),
            vec!["safety_milestone".to_string()]
        );
    }

    #[test]
    fn repeatable_event_fires_every_check() {
        let cat = catalog();
        let rng = RngService::new("s");
        let mut tracker = EventTracker::new();
        let state = GameState {
            turn: 12,
            ..GameState::default()
        };
        for _ in 0..3 {
            let fired = cat.check_all_events(&state, &rng, &mut tracker);
            assert!(fired.contains(&"hype_cycle".to_string()));
        }
        assert!(!tracker.has_fired("hype_cycle"));
    }

    #[test]
    fn unknown_and_malformed_triggers_never_fire() {
        let cat = catalog();
        assert!(matches!(
            cat.get("mystery").unwrap().trigger,
            Trigger::Unknown(_)
        ));
        let rng = RngService::new("s");
        let mut tracker = EventTracker::new();
        for turn in 0..20 {
            let state = GameState {
                turn,
                safety: Decimal::from(50),
                ..GameState::default()
            };
            let fired = cat.check_all_events(&state, &rng, &mut tracker);
            assert!(!fired.contains(&"mystery".to_string()));
            assert!(!fired.contains(&"broken".to_string()));
        }
    }

    #[test]
    fn random_trigger_is_stable_within_a_turn() {
        let cat = catalog();
        let ev = cat.get("gpu_shortage").unwrap();
        let rng = RngService::new("seed-x");
        let early = GameState {
            turn: 1,
            ..GameState::default()
        };
        assert!(!ev.trigger.holds(&ev.id, &early, &rng));
        let mut fired_any = false;
        let mut missed_any = false;
        for turn in 2..60 {
            let state = GameState {
                turn,
                ..GameState::default()
            };
            let a = ev.trigger.holds(&ev.id, &state, &rng);
            let b = ev.trigger.holds(&ev.id, &state, &rng);
            assert_eq!(a, b);
            fired_any |= a;
            missed_any |= !a;
        }
        assert!(fired_any && missed_any);
    }

    #[test]
    fn popup_choice_applies_costs_then_effects() {
        let cat = catalog();
        let mut state = GameState {
            money: Decimal::from(10_000),
            reputation: Decimal::from(8),
            ..GameState::default()
        };
        let mut sink = RecordingSink::new();
        assert_eq!(cat.get_options("funding_crunch").unwrap().len(), 2);
        let out = cat.execute_choice("funding_crunch", "bridge_loan", &mut state, &mut sink);
        assert!(out.success);
        assert_eq!(state.money, Decimal::from(40_000));
        assert_eq!(state.reputation, Decimal::from(3));
        assert_eq!(sink.texts(), vec!["The loan lands."]);
        assert_eq!(sink.sounds, vec!["coins".to_string()]);
    }

    #[test]
    fn unaffordable_choice_changes_nothing() {
        let cat = catalog();
        let mut state = GameState {
            money: Decimal::from(10_000),
            reputation: Decimal::from(2),
            ..GameState::default()
        };
        let before = state.clone();
        let mut sink = RecordingSink::new();
        let out = cat.execute_choice("funding_crunch", "bridge_loan", &mut state, &mut sink);
        assert!(!out.success);
        assert!(matches!(out.failure, Some(EventFailure::Unaffordable(_))));
        assert_eq!(state, before);
        assert_eq!(sink.messages[0].category, MessageCategory::Warning);
    }

    #[test]
    fn invalid_choice_targets_fail() {
        let cat = catalog();
        let mut state = GameState::default();
        let mut sink = RecordingSink::new();
        let out = cat.execute_choice("funding_crunch", "pray", &mut state, &mut sink);
        assert!(matches!(out.failure, Some(EventFailure::UnknownOption { .. })));
        let out = cat.execute_choice("nope", "x", &mut state, &mut sink);
        assert!(matches!(out.failure, Some(EventFailure::UnknownEvent(_))));
        let out = cat.execute_choice("safety_milestone", "x", &mut state, &mut sink);
        assert!(matches!(out.failure, Some(EventFailure::NotPopup(_))));
        assert!(cat.get_options("safety_milestone").is_none());
    }

    #[test]
    fn normal_event_applies_effect_without_cost_check() {
        let cat = catalog();
        let mut state = GameState::default();
        let mut sink = RecordingSink::new();
        let out = cat.execute("gpu_shortage", &mut state, &mut sink);
        assert!(out.success);
        assert_eq!(state.compute, Decimal::from(-10));
        assert_eq!(sink.messages[0].category, MessageCategory::Event);
        let out = cat.execute("funding_crunch", &mut state, &mut sink);
        assert!(matches!(out.failure, Some(EventFailure::RequiresChoice(_))));
    }

    #[test]
    fn load_time_schema_errors() {
        let no_options = r#"{"events": {"e": {"name": "E", "type": "popup",
            "trigger": {"type": "threshold", "parameters": {"condition": "money > 0"}}}}}"#;
        assert!(EventCatalog::from_json_str(no_options).is_err());
        let no_turn = r#"{"events": {"e": {"name": "E", "type": "normal",
            "trigger": {"type": "turn_and_resource", "parameters": {}},
            "effect": {"message": "m"}}}}"#;
        assert!(EventCatalog::from_json_str(no_turn).is_err());
        let bad_probability = r#"{"events": {"e": {"name": "E", "type": "normal",
            "trigger": {"type": "random", "parameters": {"probability": 1.5}},
            "effect": {"message": "m"}}}}"#;
        assert!(EventCatalog::from_json_str(bad_probability).is_err());
        let bad_kind = r#"{"events": {"e": {"name": "E", "type": "cutscene",
            "trigger": {"type": "random", "parameters": {"probability": 0.5}}}}}"#;
        assert!(EventCatalog::from_json_str(bad_kind).is_err());
    }
}
