#![deny(warnings)]

//! Economic cycle model for Lab Tycoon.
//!
//! One turn is one week. The first nine years (2017 onward) follow an anchored
//! timeline of funding climates; afterwards the model repeats a fixed
//! 156-week cycle through the same five phases. Funding-type actions are
//! scaled by a phase multiplier and a per-source coefficient, and gated by a
//! per-phase reputation offset.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::RngService;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Calendar year of turn 0.
pub const ANCHOR_YEAR: i32 = 2017;
/// Turns per calendar year.
pub const WEEKS_PER_YEAR: u32 = 52;
/// Length of the repeating cycle used past the last anchor.
pub const CYCLE_LENGTH: u32 = 156;
/// Maximum absolute jitter added to a phase's base multiplier.
pub const JITTER_BOUND: f64 = 0.05;

/// Errors produced when parsing economic identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EconError {
    /// Name is not one of the five phases.
    #[error("unknown economic phase: {0}")]
    UnknownPhase(String),
    /// Name is not a funding source.
    #[error("unknown funding source: {0}")]
    UnknownFundingSource(String),
}

/// Funding climate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Boom,
    Stable,
    Correction,
    Recession,
    Recovery,
}

impl Phase {
    /// All phases in table order.
    pub const ALL: [Phase; 5] = [
        Phase::Boom,
        Phase::Stable,
        Phase::Correction,
        Phase::Recession,
        Phase::Recovery,
    ];

    fn index(self) -> usize {
        match self {
            Phase::Boom => 0,
            Phase::Stable => 1,
            Phase::Correction => 2,
            Phase::Recession => 3,
            Phase::Recovery => 4,
        }
    }

    /// Base funding multiplier before jitter.
    pub fn base_multiplier(self) -> f64 {
        match self {
            Phase::Boom => 1.5,
            Phase::Stable => 1.0,
            Phase::Correction => 0.8,
            Phase::Recession => 0.6,
            Phase::Recovery => 0.9,
        }
    }

    /// Reputation offset added to every funding source's base requirement.
    pub fn availability_threshold(self) -> Decimal {
        match self {
            Phase::Boom => Decimal::from(-5),
            Phase::Stable => Decimal::ZERO,
            Phase::Correction => Decimal::from(5),
            Phase::Recession => Decimal::from(10),
            Phase::Recovery => Decimal::from(3),
        }
    }

    /// Headline used for phases synthesized past the anchored timeline.
    pub fn generic_headline(self) -> &'static str {
        match self {
            Phase::Boom => "Investors pile into AI as a new boom takes hold",
            Phase::Stable => "Funding markets settle into a steady rhythm",
            Phase::Correction => "Valuations slip as investors take profits",
            Phase::Recession => "Recession grips the economy; capital dries up",
            Phase::Recovery => "Green shoots: funding begins to return",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Boom => "BOOM",
            Phase::Stable => "STABLE",
            Phase::Correction => "CORRECTION",
            Phase::Recession => "RECESSION",
            Phase::Recovery => "RECOVERY",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = EconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| EconError::UnknownPhase(s.to_string()))
    }
}

/// Where a funding-type action draws its money from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingSource {
    Seed,
    Venture,
    Corporate,
    Government,
    Revenue,
}

/// Per-source, per-phase coefficients, columns in [`Phase::ALL`] order.
/// Venture reacts hardest to the cycle; government leans counter-cyclical.
const SOURCE_COEFFICIENTS: [[f64; 5]; 5] = [
    // BOOM  STABLE CORR  RECESS RECOV
    [1.10, 1.00, 0.95, 0.90, 0.95], // seed
    [1.60, 1.00, 0.60, 0.30, 0.80], // venture
    [1.30, 1.00, 0.80, 0.60, 0.90], // corporate
    [1.00, 1.00, 1.05, 1.20, 1.10], // government
    [1.20, 1.00, 0.90, 0.75, 0.95], // revenue
];

impl FundingSource {
    pub const ALL: [FundingSource; 5] = [
        FundingSource::Seed,
        FundingSource::Venture,
        FundingSource::Corporate,
        FundingSource::Government,
        FundingSource::Revenue,
    ];

    fn index(self) -> usize {
        match self {
            FundingSource::Seed => 0,
            FundingSource::Venture => 1,
            FundingSource::Corporate => 2,
            FundingSource::Government => 3,
            FundingSource::Revenue => 4,
        }
    }

    /// Reputation needed in a STABLE economy.
    pub fn base_requirement(self) -> Decimal {
        match self {
            FundingSource::Seed | FundingSource::Revenue => Decimal::ZERO,
            FundingSource::Venture => Decimal::from(15),
            FundingSource::Corporate => Decimal::from(20),
            FundingSource::Government => Decimal::from(10),
        }
    }

    /// Sensitivity of this source to `phase`.
    pub fn coefficient(self, phase: Phase) -> f64 {
        SOURCE_COEFFICIENTS[self.index()][phase.index()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FundingSource::Seed => "seed",
            FundingSource::Venture => "venture",
            FundingSource::Corporate => "corporate",
            FundingSource::Government => "government",
            FundingSource::Revenue => "revenue",
        }
    }
}

impl fmt::Display for FundingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FundingSource {
    type Err = EconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FundingSource::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| EconError::UnknownFundingSource(s.to_string()))
    }
}

/// One row of the historical timeline. Bounds are inclusive turns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub start_turn: u32,
    pub end_turn: u32,
    pub phase: Phase,
    pub headline: &'static str,
}

const fn anchor(start_turn: u32, end_turn: u32, phase: Phase, headline: &'static str) -> Anchor {
    Anchor {
        start_turn,
        end_turn,
        phase,
        headline,
    }
}

/// Anchored timeline, contiguous from turn 0. Ends on a cycle boundary so
/// extrapolation starts at the top of the cycle.
pub const ANCHORS: &[Anchor] = &[
    anchor(0, 25, Phase::Stable, "Deep learning funding holds steady"),
    anchor(26, 103, Phase::Boom, "Transformer hype sends venture money flooding into AI labs"),
    anchor(104, 129, Phase::Correction, "Crypto winter spills over; investors tighten belts"),
    anchor(130, 155, Phase::Stable, "Markets calm as AI spending normalizes"),
    anchor(156, 181, Phase::Recession, "Pandemic shock freezes funding markets"),
    anchor(182, 207, Phase::Recovery, "Stimulus lifts tech; fundraising resumes"),
    anchor(208, 259, Phase::Boom, "Zero-rate era: megarounds for AI startups"),
    anchor(260, 311, Phase::Correction, "Rate hikes crush tech valuations"),
    anchor(312, 363, Phase::Boom, "Chatbot moment ignites a generative AI gold rush"),
    anchor(364, 415, Phase::Stable, "AI investment plateaus at record highs"),
    anchor(416, 467, Phase::Correction, "Investors question the returns on AI capex"),
];

/// Phase lengths of the repeating cycle, summing to [`CYCLE_LENGTH`].
pub const CYCLE: [(Phase, u32); 5] = [
    (Phase::Boom, 40),
    (Phase::Correction, 20),
    (Phase::Recession, 26),
    (Phase::Recovery, 30),
    (Phase::Stable, 40),
];

/// Derived economic state for one turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomicPhaseState {
    pub phase: Phase,
    pub turn_in_phase: u32,
    pub phase_duration: u32,
    pub funding_multiplier: f64,
    pub availability_threshold: Decimal,
    pub cycle_year: i32,
    pub news_headline: String,
}

/// Phase containing `turn`: (start, duration, phase, headline).
///
/// Durations come straight from the tables so a phase that would run past
/// `u32::MAX` still reports its full length.
fn locate(turn: u32) -> (u32, u32, Phase, &'static str) {
    if let Some(a) = ANCHORS
        .iter()
        .find(|a| a.start_turn <= turn && turn <= a.end_turn)
    {
        return (
            a.start_turn,
            a.end_turn - a.start_turn + 1,
            a.phase,
            a.headline,
        );
    }
    let pos = turn % CYCLE_LENGTH;
    let mut seg_start = 0;
    for (phase, len) in CYCLE {
        if pos < seg_start + len {
            return (turn - (pos - seg_start), len, phase, phase.generic_headline());
        }
        seg_start += len;
    }
    // CYCLE sums to CYCLE_LENGTH, so pos always lands in a segment.
    let (phase, len) = CYCLE[CYCLE.len() - 1];
    (
        turn - (pos - (CYCLE_LENGTH - len)),
        len,
        phase,
        phase.generic_headline(),
    )
}

/// The economic cycle as seen by one session.
#[derive(Clone, Debug)]
pub struct EconomicCycle {
    rng: RngService,
    current: EconomicPhaseState,
}

impl EconomicCycle {
    /// Model positioned at turn 0 for `seed`.
    pub fn new(seed: &str) -> Self {
        Self::at_turn(seed, 0)
    }

    /// Model positioned at `turn` without reporting a transition. Used when
    /// restoring a saved session.
    pub fn at_turn(seed: &str, turn: u32) -> Self {
        let rng = RngService::new(seed);
        let current = Self::derive(&rng, turn);
        Self { rng, current }
    }

    fn derive(rng: &RngService, turn: u32) -> EconomicPhaseState {
        let (start, duration, phase, headline) = locate(turn);
        let jitter = rng
            .fork(&format!("economy:turn:{turn}"))
            .gen_range(-JITTER_BOUND..=JITTER_BOUND);
        EconomicPhaseState {
            phase,
            turn_in_phase: turn - start,
            phase_duration: duration,
            funding_multiplier: phase.base_multiplier() + jitter,
            availability_threshold: phase.availability_threshold(),
            cycle_year: ANCHOR_YEAR + (turn / WEEKS_PER_YEAR) as i32,
            news_headline: headline.to_string(),
        }
    }

    /// State for `turn` without changing the model.
    pub fn phase_at(&self, turn: u32) -> EconomicPhaseState {
        Self::derive(&self.rng, turn)
    }

    /// Current state.
    pub fn current(&self) -> &EconomicPhaseState {
        &self.current
    }

    /// Move to `turn`. Returns the new headline only when the phase changed.
    pub fn update_for_turn(&mut self, turn: u32) -> Option<String> {
        let next = Self::derive(&self.rng, turn);
        let previous = self.current.phase;
        let changed = previous != next.phase;
        self.current = next;
        if changed {
            info!(
                turn,
                from = %previous,
                to = %self.current.phase,
                year = self.current.cycle_year,
                "economic phase transition"
            );
            Some(self.current.news_headline.clone())
        } else {
            debug!(turn, phase = %self.current.phase, "economic phase unchanged");
            None
        }
    }

    /// Effective multiplier for money raised from `source` this turn.
    pub fn funding_multiplier(&self, source: FundingSource) -> f64 {
        self.current.funding_multiplier * source.coefficient(self.current.phase)
    }

    /// Whether a lab with `reputation` can raise from `source` this turn.
    pub fn can_access_funding_source(&self, source: FundingSource, reputation: Decimal) -> bool {
        reputation >= self.required_reputation(source)
    }

    /// Reputation needed to raise from `source` this turn.
    pub fn required_reputation(&self, source: FundingSource) -> Decimal {
        source.base_requirement() + self.current.availability_threshold
    }
}
