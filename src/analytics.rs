use serde::Serialize;

use crate::models::{Category, RiskLevel, ScreeningResult, StoredScreening};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub moderate: usize,
    pub high: usize,
}

impl RiskDistribution {
    pub fn total(&self) -> usize {
        self.low + self.moderate + self.high
    }
}

/// Bucket screenings by total score using the category thresholds.
pub fn risk_distribution(screenings: &[StoredScreening]) -> RiskDistribution {
    screenings
        .iter()
        .fold(RiskDistribution::default(), |mut acc, screening| {
            match screening.result.risk_level() {
                RiskLevel::Low => acc.low += 1,
                RiskLevel::Moderate => acc.moderate += 1,
                RiskLevel::High => acc.high += 1,
            }
            acc
        })
}

pub fn average_total_score(screenings: &[StoredScreening]) -> Option<u8> {
    if screenings.is_empty() {
        return None;
    }
    let sum: u32 = screenings
        .iter()
        .map(|s| u32::from(s.result.total_score))
        .sum();
    let average = (f64::from(sum) / screenings.len() as f64).round();
    Some(average.clamp(0.0, 100.0) as u8)
}

pub fn high_risk_count(screenings: &[StoredScreening]) -> usize {
    risk_distribution(screenings).high
}

/// Flagged findings across every category, in category order.
pub fn all_findings(result: &ScreeningResult) -> Vec<(Category, &str)> {
    result
        .category_scores
        .iter()
        .flat_map(|(category, score)| {
            score
                .findings
                .iter()
                .map(move |finding| (*category, finding.as_str()))
        })
        .collect()
}

/// Screenings ordered by total score, highest first; ties keep the newer one first.
pub fn highest_risk(screenings: &[StoredScreening]) -> Vec<&StoredScreening> {
    let mut ranked: Vec<&StoredScreening> = screenings.iter().collect();
    ranked.sort_by(|a, b| {
        b.result
            .total_score
            .cmp(&a.result.total_score)
            .then_with(|| b.result.date.cmp(&a.result.date))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryScore, Role};
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn stored(total_score: u8, days_ago: i64) -> StoredScreening {
        let base = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let category_scores = Category::ALL
            .into_iter()
            .map(|category| {
                let findings = if category == Category::Reading && total_score >= 65 {
                    vec!["Harfleri karıştırır.".to_string()]
                } else {
                    Vec::new()
                };
                let level = RiskLevel::from_score(total_score);
                (
                    category,
                    CategoryScore {
                        score: total_score,
                        risk_level: level,
                        risk_label: level.label().to_string(),
                        findings,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        StoredScreening {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            result: ScreeningResult {
                total_score,
                student_name: "Zeynep Kaya".to_string(),
                category_scores,
                date: base - Duration::days(days_ago),
                completed_by: Role::Teacher,
                ai_analysis: None,
            },
        }
    }

    #[test]
    fn distribution_uses_risk_thresholds() {
        let screenings = vec![stored(10, 1), stored(34, 2), stored(35, 3), stored(65, 4), stored(90, 5)];
        let distribution = risk_distribution(&screenings);
        assert_eq!(
            distribution,
            RiskDistribution {
                low: 2,
                moderate: 1,
                high: 2
            }
        );
        assert_eq!(distribution.total(), 5);
        assert_eq!(high_risk_count(&screenings), 2);
    }

    #[test]
    fn average_rounds_and_handles_empty() {
        assert_eq!(average_total_score(&[]), None);
        let screenings = vec![stored(10, 1), stored(21, 2)];
        assert_eq!(average_total_score(&screenings), Some(16));
    }

    #[test]
    fn highest_risk_sorts_by_score_then_recency() {
        let screenings = vec![stored(40, 1), stored(80, 9), stored(80, 2)];
        let ranked = highest_risk(&screenings);
        assert_eq!(ranked[0].id, screenings[2].id);
        assert_eq!(ranked[1].id, screenings[1].id);
        assert_eq!(ranked[2].id, screenings[0].id);
    }

    #[test]
    fn findings_flatten_in_category_order() {
        let screening = stored(70, 0);
        let findings = all_findings(&screening.result);
        assert_eq!(findings, vec![(Category::Reading, "Harfleri karıştırır.")]);
    }
}
