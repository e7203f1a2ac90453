//! End-of-turn orchestration.

use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{
    format_amount, format_money, GameState, MessageCategory, NotificationSink, RecordedMessage,
    SimConfig,
};
use sim_econ::EconomicCycle;
use tracing::{debug, info};

/// Value of one touched field before and after a turn.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceDelta {
    pub field: &'static str,
    pub before: Decimal,
    pub after: Decimal,
}

/// Everything that happened during one end-turn call, in order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TurnReport {
    pub success: bool,
    pub messages: Vec<RecordedMessage>,
    pub deltas: Vec<ResourceDelta>,
    pub game_over: bool,
    pub victory: bool,
}

impl TurnReport {
    fn push(&mut self, sink: &mut dyn NotificationSink, text: String, category: MessageCategory) {
        sink.display_message(&text, category);
        self.messages.push(RecordedMessage { text, category });
    }

    /// Refused end turn; nothing changed.
    pub fn rejected(
        sink: &mut dyn NotificationSink,
        state: &GameState,
        reason: impl Into<String>,
    ) -> Self {
        let mut report = TurnReport {
            success: false,
            game_over: state.game_over,
            victory: state.victory,
            ..TurnReport::default()
        };
        report.push(sink, reason.into(), MessageCategory::Warning);
        report
    }

    /// Delta recorded for `field`, if it was touched.
    pub fn delta(&self, field: &str) -> Option<&ResourceDelta> {
        self.deltas.iter().find(|d| d.field == field)
    }
}

/// Advance `state` by one turn.
///
/// Order: turn counter, economy, compute decay, staff maintenance, then
/// terminal checks (money, compute, victory). A defeat on the same turn
/// suppresses the victory check.
pub fn end_turn(
    state: &mut GameState,
    economy: &mut EconomicCycle,
    config: &SimConfig,
    sink: &mut dyn NotificationSink,
) -> TurnReport {
    if state.game_over {
        return TurnReport::rejected(sink, state, "The game is over");
    }
    let mut report = TurnReport {
        success: true,
        ..TurnReport::default()
    };
    let turn_before = state.turn;
    let money_before = state.money;
    let compute_before = state.compute;

    state.turn = state.turn.saturating_add(1);
    report.push(
        sink,
        format!("Week {} begins.", state.turn),
        MessageCategory::Info,
    );

    if let Some(headline) = economy.update_for_turn(state.turn) {
        let econ = economy.current();
        report.push(
            sink,
            format!("{} ({}, {})", headline, econ.phase, econ.cycle_year),
            MessageCategory::Event,
        );
    }

    if state.compute_rate > Decimal::ZERO {
        let used = state.compute.min(state.compute_rate).max(Decimal::ZERO);
        state.compute = (state.compute - state.compute_rate).max(Decimal::ZERO);
        report.push(
            sink,
            format!("Used {} compute.", format_amount(used)),
            MessageCategory::Info,
        );
    }

    let staff = state.total_employees();
    let upkeep = Decimal::from(staff).saturating_mul(state.staff_maintenance_cost);
    if upkeep > Decimal::ZERO {
        state.money = state.money.saturating_sub(upkeep);
        report.push(
            sink,
            format!(
                "Paid {} in staff maintenance for {} employees (balance {}).",
                format_money(upkeep),
                staff,
                format_money(state.money)
            ),
            MessageCategory::Info,
        );
    }

    if state.money <= Decimal::ZERO {
        state.end_game(false, "out of money");
        report.push(
            sink,
            format!(
                "Game over: out of money (balance {}).",
                format_money(state.money)
            ),
            MessageCategory::Error,
        );
    } else if state.compute <= Decimal::ZERO {
        state.end_game(false, "out of compute");
        report.push(
            sink,
            "Game over: out of compute. Your models go dark.".to_string(),
            MessageCategory::Error,
        );
    } else if state.safety >= config.victory_safety_threshold {
        state.end_game(true, "safety threshold reached");
        report.push(
            sink,
            format!(
                "Victory! Safety reached {} of {}.",
                format_amount(state.safety),
                format_amount(config.victory_safety_threshold)
            ),
            MessageCategory::Success,
        );
    }

    sink.refresh(state);

    report.deltas = vec![
        ResourceDelta {
            field: "turn",
            before: Decimal::from(turn_before),
            after: Decimal::from(state.turn),
        },
        ResourceDelta {
            field: "compute",
            before: compute_before,
            after: state.compute,
        },
        ResourceDelta {
            field: "money",
            before: money_before,
            after: state.money,
        },
    ];
    report.game_over = state.game_over;
    report.victory = state.victory;
    if state.game_over {
        info!(
            turn = state.turn,
            victory = state.victory,
            reason = state.game_over_reason.as_deref().unwrap_or_default(),
            "session ended"
        );
    } else {
        debug!(turn = state.turn, money = %state.money, compute = %state.compute, "turn ended");
    }
    report
}
