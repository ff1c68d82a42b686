use crate::error::QuadError;
use crate::types::Level;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// AdoptionZone
// ---------------------------------------------------------------------------

/// AI-autonomy category derived from a participant's skill and trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdoptionZone {
    RestrictedAi,
    CautiousAi,
    SupervisedAutonomy,
    AssistedAi,
    BalancedAi,
    CollaborativeAi,
    ExpertReview,
    EnhancedAi,
    DelegatedAi,
}

/// Rows are skill (low, medium, high), columns are trust (low, medium, high).
const MATRIX: [[AdoptionZone; 3]; 3] = [
    [
        AdoptionZone::RestrictedAi,
        AdoptionZone::CautiousAi,
        AdoptionZone::SupervisedAutonomy,
    ],
    [
        AdoptionZone::AssistedAi,
        AdoptionZone::BalancedAi,
        AdoptionZone::CollaborativeAi,
    ],
    [
        AdoptionZone::ExpertReview,
        AdoptionZone::EnhancedAi,
        AdoptionZone::DelegatedAi,
    ],
];

/// Look up the zone for `(skill, trust)`. Total over the 3×3 domain.
pub fn evaluate(skill: Level, trust: Level) -> AdoptionZone {
    MATRIX[skill as usize][trust as usize]
}

impl AdoptionZone {
    pub fn all() -> &'static [AdoptionZone] {
        &[
            AdoptionZone::RestrictedAi,
            AdoptionZone::CautiousAi,
            AdoptionZone::SupervisedAutonomy,
            AdoptionZone::AssistedAi,
            AdoptionZone::BalancedAi,
            AdoptionZone::CollaborativeAi,
            AdoptionZone::ExpertReview,
            AdoptionZone::EnhancedAi,
            AdoptionZone::DelegatedAi,
        ]
    }

    /// The `(skill, trust)` cell this zone occupies.
    pub fn coordinates(self) -> (Level, Level) {
        let (row, col) = match self {
            AdoptionZone::RestrictedAi => (0, 0),
            AdoptionZone::CautiousAi => (0, 1),
            AdoptionZone::SupervisedAutonomy => (0, 2),
            AdoptionZone::AssistedAi => (1, 0),
            AdoptionZone::BalancedAi => (1, 1),
            AdoptionZone::CollaborativeAi => (1, 2),
            AdoptionZone::ExpertReview => (2, 0),
            AdoptionZone::EnhancedAi => (2, 1),
            AdoptionZone::DelegatedAi => (2, 2),
        };
        (Level::all()[row], Level::all()[col])
    }

    /// Low-trust zones need a review-level endorsement before an AI-assisted
    /// transition is accepted.
    pub fn requires_review(self) -> bool {
        self.coordinates().1 == Level::Low
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdoptionZone::RestrictedAi => "restricted_ai",
            AdoptionZone::CautiousAi => "cautious_ai",
            AdoptionZone::SupervisedAutonomy => "supervised_autonomy",
            AdoptionZone::AssistedAi => "assisted_ai",
            AdoptionZone::BalancedAi => "balanced_ai",
            AdoptionZone::CollaborativeAi => "collaborative_ai",
            AdoptionZone::ExpertReview => "expert_review",
            AdoptionZone::EnhancedAi => "enhanced_ai",
            AdoptionZone::DelegatedAi => "delegated_ai",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AdoptionZone::RestrictedAi => "Restricted AI",
            AdoptionZone::CautiousAi => "Cautious AI",
            AdoptionZone::SupervisedAutonomy => "Supervised Autonomy",
            AdoptionZone::AssistedAi => "Assisted AI",
            AdoptionZone::BalancedAi => "Balanced AI",
            AdoptionZone::CollaborativeAi => "Collaborative AI",
            AdoptionZone::ExpertReview => "Expert Review",
            AdoptionZone::EnhancedAi => "Enhanced AI",
            AdoptionZone::DelegatedAi => "Delegated AI",
        }
    }
}

impl fmt::Display for AdoptionZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for AdoptionZone {
    type Err = QuadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        AdoptionZone::all()
            .iter()
            .copied()
            .find(|z| z.as_str() == wanted)
            .ok_or_else(|| QuadError::InvalidZone(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Matrix view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MatrixCell {
    pub skill: Level,
    pub trust: Level,
    pub zone: AdoptionZone,
    pub name: &'static str,
    pub requires_review: bool,
}

/// Every cell of the matrix, skill-major.
pub fn matrix() -> Vec<MatrixCell> {
    Level::all()
        .iter()
        .flat_map(|&skill| {
            Level::all().iter().map(move |&trust| {
                let zone = evaluate(skill, trust);
                MatrixCell {
                    skill,
                    trust,
                    zone,
                    name: zone.display_name(),
                    requires_review: zone.requires_review(),
                }
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn matrix_matches_published_table() {
        assert_eq!(evaluate(Level::Low, Level::Low), AdoptionZone::RestrictedAi);
        assert_eq!(evaluate(Level::Low, Level::Medium), AdoptionZone::CautiousAi);
        assert_eq!(
            evaluate(Level::Low, Level::High),
            AdoptionZone::SupervisedAutonomy
        );
        assert_eq!(evaluate(Level::Medium, Level::Low), AdoptionZone::AssistedAi);
        assert_eq!(evaluate(Level::Medium, Level::Medium), AdoptionZone::BalancedAi);
        assert_eq!(
            evaluate(Level::Medium, Level::High),
            AdoptionZone::CollaborativeAi
        );
        assert_eq!(evaluate(Level::High, Level::Low), AdoptionZone::ExpertReview);
        assert_eq!(evaluate(Level::High, Level::Medium), AdoptionZone::EnhancedAi);
        assert_eq!(evaluate(Level::High, Level::High), AdoptionZone::DelegatedAi);
    }

    #[test]
    fn evaluate_is_total_and_stable() {
        let mut zones = HashSet::new();
        for &skill in Level::all() {
            for &trust in Level::all() {
                let first = evaluate(skill, trust);
                for _ in 0..3 {
                    assert_eq!(evaluate(skill, trust), first);
                }
                assert_eq!(first.coordinates(), (skill, trust));
                zones.insert(first);
            }
        }
        assert_eq!(zones.len(), 9);
    }

    #[test]
    fn only_low_trust_column_requires_review() {
        let gated: Vec<_> = AdoptionZone::all()
            .iter()
            .filter(|z| z.requires_review())
            .copied()
            .collect();
        assert_eq!(
            gated,
            vec![
                AdoptionZone::RestrictedAi,
                AdoptionZone::AssistedAi,
                AdoptionZone::ExpertReview,
            ]
        );
    }

    #[test]
    fn zone_parses_display_and_slug_forms() {
        assert_eq!(
            "Delegated AI".parse::<AdoptionZone>().unwrap(),
            AdoptionZone::DelegatedAi
        );
        assert_eq!(
            "supervised-autonomy".parse::<AdoptionZone>().unwrap(),
            AdoptionZone::SupervisedAutonomy
        );
        assert!("yolo".parse::<AdoptionZone>().is_err());
    }

    #[test]
    fn matrix_view_has_nine_cells() {
        let cells = matrix();
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0].name, "Restricted AI");
        assert!(cells[0].requires_review);
        assert_eq!(cells[8].name, "Delegated AI");
        assert!(!cells[8].requires_review);
    }
}
