use crate::error::QuadError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The four QUAD stages, totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Question,
    Understand,
    Allocate,
    Deliver,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[
            Stage::Question,
            Stage::Understand,
            Stage::Allocate,
            Stage::Deliver,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Stage> {
        Stage::all().get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Question => "question",
            Stage::Understand => "understand",
            Stage::Allocate => "allocate",
            Stage::Deliver => "deliver",
        }
    }

    /// Single-letter label used in the QUAD acronym.
    pub fn letter(self) -> char {
        match self {
            Stage::Question => 'Q',
            Stage::Understand => 'U',
            Stage::Allocate => 'A',
            Stage::Deliver => 'D',
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = QuadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "question" | "q" => Ok(Stage::Question),
            "understand" | "u" => Ok(Stage::Understand),
            "allocate" | "a" => Ok(Stage::Allocate),
            "deliver" | "d" => Ok(Stage::Deliver),
            _ => Err(QuadError::UnknownStage(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// FlowState
// ---------------------------------------------------------------------------

/// Where a flow currently sits: one of the stages, or a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Question,
    Understand,
    Allocate,
    Deliver,
    Closed,
    Abandoned,
}

impl FlowState {
    pub fn stage(self) -> Option<Stage> {
        match self {
            FlowState::Question => Some(Stage::Question),
            FlowState::Understand => Some(Stage::Understand),
            FlowState::Allocate => Some(Stage::Allocate),
            FlowState::Deliver => Some(Stage::Deliver),
            FlowState::Closed | FlowState::Abandoned => None,
        }
    }

    /// The only state a forward transition may target from here.
    ///
    /// `Abandoned` is never a successor; it is reached through an explicit abandon.
    pub fn successor(self) -> Option<FlowState> {
        match self {
            FlowState::Question => Some(FlowState::Understand),
            FlowState::Understand => Some(FlowState::Allocate),
            FlowState::Allocate => Some(FlowState::Deliver),
            FlowState::Deliver => Some(FlowState::Closed),
            FlowState::Closed | FlowState::Abandoned => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Closed | FlowState::Abandoned)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlowState::Question => "question",
            FlowState::Understand => "understand",
            FlowState::Allocate => "allocate",
            FlowState::Deliver => "deliver",
            FlowState::Closed => "closed",
            FlowState::Abandoned => "abandoned",
        }
    }
}

impl From<Stage> for FlowState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Question => FlowState::Question,
            Stage::Understand => FlowState::Understand,
            Stage::Allocate => FlowState::Allocate,
            Stage::Deliver => FlowState::Deliver,
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FlowState {
    type Err = QuadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "closed" => Ok(FlowState::Closed),
            "abandoned" => Ok(FlowState::Abandoned),
            other => other.parse::<Stage>().map(FlowState::from),
        }
    }
}

// ---------------------------------------------------------------------------
// ParticipationLevel
// ---------------------------------------------------------------------------

/// Authority a role holds at a stage. Declared weakest first so that
/// `Primary > Support > Review > Inform` under the derived ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationLevel {
    Inform,
    Review,
    Support,
    Primary,
}

impl ParticipationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipationLevel::Inform => "inform",
            ParticipationLevel::Review => "review",
            ParticipationLevel::Support => "support",
            ParticipationLevel::Primary => "primary",
        }
    }
}

impl fmt::Display for ParticipationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ParticipationLevel {
    type Err = QuadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(ParticipationLevel::Primary),
            "support" => Ok(ParticipationLevel::Support),
            "review" => Ok(ParticipationLevel::Review),
            "inform" => Ok(ParticipationLevel::Inform),
            _ => Err(QuadError::InvalidParticipation(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Three-point ordinal scale shared by skill and trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn all() -> &'static [Level] {
        &[Level::Low, Level::Medium, Level::High]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = QuadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Level::Low),
            "medium" | "med" => Ok(Level::Medium),
            "high" => Ok(Level::High),
            _ => Err(QuadError::InvalidLevel(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
