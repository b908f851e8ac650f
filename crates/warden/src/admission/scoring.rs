use serde::{Deserialize, Serialize};

use super::domain::{Origin, SubjectAttributes};
use chrono::NaiveDate;

/// Lower bound of the priority range.
pub const SCORE_FLOOR: f64 = 1.0;
/// Upper bound of the priority range.
pub const SCORE_CEILING: f64 = 1000.0;

/// Factors contributing to a subject's priority score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreFactor {
    SupportGap,
    PublicImpact,
    AgeBracket,
    Origin,
    EconomicStanding,
    ElevatedStatus,
}

/// Discrete contribution to a score, allowing transparent audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub points: f64,
    pub notes: String,
}

/// Compute the priority score for a set of attributes, clamped to
/// [`SCORE_FLOOR`, `SCORE_CEILING`]. Deterministic and side-effect free.
pub fn priority_score(attributes: &SubjectAttributes, today: NaiveDate) -> f64 {
    score_breakdown(attributes, today).1
}

/// Compute the score together with its per-factor breakdown.
pub fn score_breakdown(
    attributes: &SubjectAttributes,
    today: NaiveDate,
) -> (Vec<ScoreComponent>, f64) {
    let mut components = Vec::with_capacity(6);

    let support_points = f64::from(10 - i16::from(attributes.support_level)) * 20.0;
    components.push(ScoreComponent {
        factor: ScoreFactor::SupportGap,
        points: support_points,
        notes: format!("support level {}", attributes.support_level),
    });

    let impact_points = f64::from(attributes.impact_score) * 20.0;
    components.push(ScoreComponent {
        factor: ScoreFactor::PublicImpact,
        points: impact_points,
        notes: format!("impact score {}", attributes.impact_score),
    });

    let age = attributes.age_on(today);
    let age_points = if (20..=50).contains(&age) {
        100.0
    } else if (51..=75).contains(&age) || (15..20).contains(&age) {
        50.0
    } else {
        0.0
    };
    components.push(ScoreComponent {
        factor: ScoreFactor::AgeBracket,
        points: age_points,
        notes: format!("age {age}"),
    });

    let origin_points = match attributes.origin {
        Origin::A => 0.0,
        Origin::B => 40.0,
        Origin::C => 80.0,
    };
    components.push(ScoreComponent {
        factor: ScoreFactor::Origin,
        points: origin_points,
        notes: format!("origin {}", attributes.origin.label()),
    });

    let economic_points = f64::from(attributes.economic_percentile) * 20.0;
    components.push(ScoreComponent {
        factor: ScoreFactor::EconomicStanding,
        points: economic_points,
        notes: format!("economic percentile {}", attributes.economic_percentile),
    });

    let base = support_points + impact_points + age_points + origin_points + economic_points;
    let total = if attributes.elevated {
        let uplift = base * 0.25;
        components.push(ScoreComponent {
            factor: ScoreFactor::ElevatedStatus,
            points: uplift,
            notes: "elevated status uplift (25%)".to_string(),
        });
        base * 1.25
    } else {
        base
    };

    (components, total.clamp(SCORE_FLOOR, SCORE_CEILING))
}
