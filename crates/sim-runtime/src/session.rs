//! One player's game: state, randomness, event bookkeeping and economy.

use crate::turn::{self, TurnReport};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{GameState, MessageCategory, NotificationSink, RngService, SimConfig};
use sim_econ::EconomicCycle;
use sim_rules::{
    ActionCatalog, ActionOutcome, EventCatalog, EventFailure, EventKind, EventOutcome,
    EventTracker, RequirementFailure,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one event check.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventCheck {
    /// Every event that fired, in catalog order.
    pub fired: Vec<String>,
    /// Popup events queued for a choice.
    pub popups: Vec<String>,
    /// Outcomes of normal events applied immediately.
    pub outcomes: Vec<EventOutcome>,
}

/// Everything needed to rebuild a session besides the shared catalogs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionParts {
    pub state: GameState,
    pub triggered_events: Vec<String>,
    pub pending_popups: Vec<String>,
    pub events_checked_turn: Option<u32>,
}

/// A single simulation session. Catalogs and config are shared read-only.
#[derive(Clone, Debug)]
pub struct Session {
    actions: Arc<ActionCatalog>,
    events: Arc<EventCatalog>,
    config: Arc<SimConfig>,
    state: GameState,
    rng: RngService,
    tracker: EventTracker,
    economy: EconomicCycle,
    pending: VecDeque<String>,
    events_checked_turn: Option<u32>,
}

impl Session {
    /// Fresh game. `seed` overrides the configured seed.
    pub fn new(
        actions: Arc<ActionCatalog>,
        events: Arc<EventCatalog>,
        config: Arc<SimConfig>,
        seed: Option<&str>,
    ) -> Self {
        let state = GameState::new(&config, seed);
        info!(seed = %state.seed, "new session");
        Self {
            rng: RngService::new(state.seed.clone()),
            economy: EconomicCycle::new(&state.seed),
            tracker: EventTracker::new(),
            pending: VecDeque::new(),
            events_checked_turn: None,
            actions,
            events,
            config,
            state,
        }
    }

    /// Rebuild a saved session. Unknown popup ids are dropped.
    pub fn restore(
        actions: Arc<ActionCatalog>,
        events: Arc<EventCatalog>,
        config: Arc<SimConfig>,
        parts: SessionParts,
    ) -> Self {
        let pending = parts
            .pending_popups
            .into_iter()
            .filter(|id| {
                let known = events.get(id).is_some_and(|e| e.kind == EventKind::Popup);
                if !known {
                    warn!(event = %id, "dropping unknown pending popup");
                }
                known
            })
            .collect();
        let state = parts.state;
        debug!(seed = %state.seed, turn = state.turn, "session restored");
        Self {
            rng: RngService::new(state.seed.clone()),
            economy: EconomicCycle::at_turn(&state.seed, state.turn),
            tracker: EventTracker::from_ids(parts.triggered_events),
            pending,
            events_checked_turn: parts.events_checked_turn,
            actions,
            events,
            config,
            state,
        }
    }

    /// Snapshot of everything that is not shared.
    pub fn parts(&self) -> SessionParts {
        SessionParts {
            state: self.state.clone(),
            triggered_events: self.tracker.ids().map(str::to_string).collect(),
            pending_popups: self.pending.iter().cloned().collect(),
            events_checked_turn: self.events_checked_turn,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn actions(&self) -> &ActionCatalog {
        &self.actions
    }

    pub fn events(&self) -> &EventCatalog {
        &self.events
    }

    pub fn economy(&self) -> &EconomicCycle {
        &self.economy
    }

    pub fn tracker(&self) -> &EventTracker {
        &self.tracker
    }

    /// Popup events awaiting a choice, oldest first.
    pub fn pending_popups(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn is_over(&self) -> bool {
        self.state.game_over
    }

    /// Action ids executable right now, in catalog order. Funding actions
    /// closed by the current economy are left out.
    pub fn available_actions(&self) -> Vec<&str> {
        self.actions
            .list_available(&self.state)
            .into_iter()
            .filter(|id| self.funding_gate(id).is_ok())
            .collect()
    }

    fn funding_gate(&self, id: &str) -> Result<Decimal, RequirementFailure> {
        let Some(source) = self.actions.get(id).and_then(|a| a.funding_source) else {
            return Ok(Decimal::ONE);
        };
        if self
            .economy
            .can_access_funding_source(source, self.state.reputation)
        {
            // Phase multipliers are bounded table values plus a small jitter.
            Ok(Decimal::from_f64(self.economy.funding_multiplier(source)).unwrap_or(Decimal::ONE))
        } else {
            Err(RequirementFailure::FundingLocked {
                source,
                required: self.economy.required_reputation(source),
                have: self.state.reputation,
            })
        }
    }

    /// Execute an action. Funding actions are gated on reputation and scaled
    /// by the current economy.
    pub fn execute_action(&mut self, id: &str, sink: &mut dyn NotificationSink) -> ActionOutcome {
        let multiplier = match self.actions.check_requirements(id, &self.state) {
            Ok(()) if !self.state.game_over => match self.funding_gate(id) {
                Ok(m) => m,
                Err(failure) => {
                    let outcome = ActionOutcome::failed(id, failure);
                    warn!(action = id, reason = %outcome.message, "funding unavailable");
                    sink.display_message(&outcome.message, MessageCategory::Warning);
                    return outcome;
                }
            },
            // Requirement failures are reported by the catalog itself.
            _ => Decimal::ONE,
        };
        self.actions
            .execute_scaled(id, &mut self.state, sink, multiplier)
    }

    /// Evaluate triggers for the current turn. Normal events apply at once,
    /// popups are queued. A second call in the same turn does nothing.
    pub fn check_events(&mut self, sink: &mut dyn NotificationSink) -> EventCheck {
        if self.state.game_over || self.events_checked_turn == Some(self.state.turn) {
            return EventCheck::default();
        }
        self.events_checked_turn = Some(self.state.turn);
        let fired = self
            .events
            .check_all_events(&self.state, &self.rng, &mut self.tracker);
        let mut check = EventCheck {
            fired: fired.clone(),
            ..EventCheck::default()
        };
        for id in fired {
            let Some(kind) = self.events.get(&id).map(|e| e.kind) else {
                continue;
            };
            match kind {
                EventKind::Normal => {
                    let outcome = self.events.execute(&id, &mut self.state, sink);
                    check.outcomes.push(outcome);
                }
                EventKind::Popup => {
                    if let Some(ev) = self.events.get(&id) {
                        sink.display_message(
                            &format!("{}: {}", ev.name, ev.description),
                            MessageCategory::Event,
                        );
                    }
                    self.pending.push_back(id.clone());
                    check.popups.push(id);
                }
            }
        }
        check
    }

    /// Resolve a pending popup. The popup stays queued if the choice fails.
    pub fn choose(
        &mut self,
        event_id: &str,
        option_id: &str,
        sink: &mut dyn NotificationSink,
    ) -> EventOutcome {
        let Some(pos) = self.pending.iter().position(|p| p == event_id) else {
            let failure = match self.events.get(event_id) {
                Some(ev) if ev.kind == EventKind::Popup => {
                    EventFailure::NotPending(event_id.to_string())
                }
                Some(_) => EventFailure::NotPopup(event_id.to_string()),
                None => EventFailure::UnknownEvent(event_id.to_string()),
            };
            return EventOutcome::failed(event_id, Some(option_id), failure);
        };
        let outcome = self
            .events
            .execute_choice(event_id, option_id, &mut self.state, sink);
        if outcome.success {
            self.pending.remove(pos);
        }
        outcome
    }

    /// Drop a pending popup without choosing. Returns whether it was queued.
    pub fn dismiss(&mut self, event_id: &str) -> bool {
        match self.pending.iter().position(|p| p == event_id) {
            Some(pos) => {
                self.pending.remove(pos);
                debug!(event = event_id, "popup dismissed");
                true
            }
            None => false,
        }
    }

    /// End the turn. Refused while a popup awaits a choice.
    pub fn end_turn(&mut self, sink: &mut dyn NotificationSink) -> TurnReport {
        if let Some(id) = self.pending.front() {
            return TurnReport::rejected(sink, &self.state, format!("Decide on {id} first"));
        }
        turn::end_turn(&mut self.state, &mut self.economy, &self.config, sink)
    }

    /// Start over with the same seed.
    pub fn reset(&mut self) {
        let seed = self.state.seed.clone();
        self.reset_with_seed(&seed);
    }

    /// Start over with a new seed.
    pub fn reset_with_seed(&mut self, seed: &str) {
        self.state = GameState::new(&self.config, Some(seed));
        self.rng = RngService::new(seed);
        self.economy = EconomicCycle::new(seed);
        self.tracker.reset();
        self.pending.clear();
        self.events_checked_turn = None;
        info!(seed, "session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{NullSink, RecordingSink};

    const ACTIONS: &str = r#"{
        "actions": {
            "hire_safety_researcher": {
                "name": "Hire Safety Researcher", "category": "hiring",
                "costs": {"money": 50000},
                "effects": {"safety": 2, "employees.safety_researchers": 1}
            },
            "raise_venture_round": {
                "name": "Raise Venture Round", "category": "funding",
                "effects": {"money": 100000},
                "funding_source": "venture"
            },
            "apply_seed_grant": {
                "name": "Seed Grant", "category": "funding",
                "effects": {"money": 10000},
                "funding_source": "seed"
            }
        },
        "categories": {"hiring": {"displayName": "Hiring"}, "funding": {"displayName": "Funding"}}
    }"#;

    const EVENTS: &str = r#"{
        "events": {
            "crunch": {
                "name": "Crunch", "description": "Cash is tight.", "type": "popup",
                "trigger": {"type": "threshold", "parameters": {"condition": "money < 60000"}},
                "options": [
                    {"id": "loan", "text": "Loan", "costs": {"reputation": 50}, "effects": {"money": 1}},
                    {"id": "tighten", "text": "Tighten belts", "effects": {"reputation": -1}}
                ]
            },
            "noticed": {
                "name": "Noticed", "type": "normal",
                "trigger": {"type": "threshold", "parameters": {"condition": "safety >= 2"}},
                "effect": {"message": "You are noticed.", "effects": {"reputation": 1}}
            }
        },
        "event_types": {"normal": {"displayName": "Event"}, "popup": {"displayName": "Decision"}}
    }"#;

    fn session(seed: &str) -> Session {
        Session::new(
            Arc::new(ActionCatalog::from_json_str(ACTIONS).unwrap()),
            Arc::new(EventCatalog::from_json_str(EVENTS).unwrap()),
            Arc::new(SimConfig::default()),
            Some(seed),
        )
    }

    #[test]
    fn normal_events_apply_and_popups_queue() {
        let mut s = session("events");
        let mut sink = RecordingSink::new();
        assert!(s.execute_action("hire_safety_researcher", &mut sink).success);
        let rep = s.state().reputation;
        let check = s.check_events(&mut sink);
        assert_eq!(check.fired, vec!["crunch".to_string(), "noticed".to_string()]);
        assert_eq!(check.popups, vec!["crunch".to_string()]);
        assert_eq!(check.outcomes.len(), 1);
        assert_eq!(s.state().reputation, rep + Decimal::ONE);
        assert_eq!(s.pending_popups().collect::<Vec<_>>(), vec!["crunch"]);
        assert!(sink
            .messages
            .iter()
            .any(|m| m.category == MessageCategory::Event && m.text == "You are noticed."));
    }

    #[test]
    fn second_check_in_same_turn_is_noop() {
        let mut s = session("events");
        s.execute_action("hire_safety_researcher", &mut NullSink);
        assert!(!s.check_events(&mut NullSink).fired.is_empty());
        assert_eq!(s.check_events(&mut NullSink), EventCheck::default());
    }

    #[test]
    fn end_turn_waits_for_popup_choice() {
        let mut s = session("popup");
        s.execute_action("hire_safety_researcher", &mut NullSink);
        s.check_events(&mut NullSink);
        let report = s.end_turn(&mut NullSink);
        assert!(!report.success);
        assert_eq!(s.state().turn, 0);

        let before = s.state().clone();
        let failed = s.choose("crunch", "loan", &mut NullSink);
        assert!(!failed.success);
        assert_eq!(s.state(), &before);
        assert_eq!(s.pending_popups().count(), 1);

        assert!(s.choose("crunch", "tighten", &mut NullSink).success);
        assert_eq!(s.pending_popups().count(), 0);
        assert!(s.end_turn(&mut NullSink).success);
        assert_eq!(s.state().turn, 1);
    }

    #[test]
    fn choosing_unqueued_popup_fails() {
        let mut s = session("unqueued");
        let out = s.choose("crunch", "tighten", &mut NullSink);
        assert_eq!(
            out.failure,
            Some(EventFailure::NotPending("crunch".to_string()))
        );
        let out = s.choose("ghost", "x", &mut NullSink);
        assert!(matches!(out.failure, Some(EventFailure::UnknownEvent(_))));
    }

    #[test]
    fn dismiss_unblocks_end_turn() {
        let mut s = session("dismiss");
        s.execute_action("hire_safety_researcher", &mut NullSink);
        s.check_events(&mut NullSink);
        assert!(s.dismiss("crunch"));
        assert!(!s.dismiss("crunch"));
        assert!(s.end_turn(&mut NullSink).success);
    }

    #[test]
    fn funding_is_scaled_by_economy() {
        let mut s = session("funding");
        let mult = s.economy().funding_multiplier(sim_econ::FundingSource::Seed);
        let money = s.state().money;
        let out = s.execute_action("apply_seed_grant", &mut NullSink);
        assert!(out.success);
        let raised = (Decimal::from(10_000) * Decimal::from_f64(mult).unwrap())
            .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
        assert_eq!(s.state().money, money + raised);
        assert!(s.state().money.scale() <= 2);
    }

    #[test]
    fn locked_funding_changes_nothing() {
        let mut s = session("locked");
        // Venture needs reputation 15 in a stable market; the lab starts at 10.
        let before = s.state().clone();
        let mut sink = RecordingSink::new();
        let out = s.execute_action("raise_venture_round", &mut sink);
        assert!(!out.success);
        assert!(matches!(
            out.failure,
            Some(RequirementFailure::FundingLocked { .. })
        ));
        assert_eq!(s.state(), &before);
        assert_eq!(sink.messages[0].category, MessageCategory::Warning);
        assert!(!s.available_actions().contains(&"raise_venture_round"));
        assert!(s.available_actions().contains(&"apply_seed_grant"));
    }

    #[test]
    fn reset_restores_a_fresh_game() {
        let mut s = session("reset");
        s.execute_action("hire_safety_researcher", &mut NullSink);
        s.check_events(&mut NullSink);
        s.reset();
        assert_eq!(s.state().turn, 0);
        assert_eq!(s.state().money, SimConfig::default().starting_money);
        assert_eq!(s.pending_popups().count(), 0);
        assert!(!s.tracker().has_fired("noticed"));
        assert_eq!(s.state().seed, "reset");
    }

    #[test]
    fn parts_roundtrip_through_restore() {
        let mut s = session("parts");
        s.execute_action("hire_safety_researcher", &mut NullSink);
        s.check_events(&mut NullSink);
        let parts = s.parts();
        let restored = Session::restore(
            Arc::new(ActionCatalog::from_json_str(ACTIONS).unwrap()),
            Arc::new(EventCatalog::from_json_str(EVENTS).unwrap()),
            Arc::new(SimConfig::default()),
            parts.clone(),
        );
        assert_eq!(restored.parts(), parts);
        assert_eq!(restored.economy().current(), s.economy().current());
    }
}
