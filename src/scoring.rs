//! Weighted questionnaire scoring.
//!
//! Each category is scored as `sum(answer * weight) / sum(4 * weight)` over the
//! questions asked of the responder's role, scaled to 0-100. The total score is
//! the same ratio taken over every applicable question, so categories with more
//! or heavier questions weigh more in it. It is not a mean of the category scores.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::ScoringError;
use crate::models::{
    AnswerValue, Answers, Category, CategoryScore, ResponderProfile, RiskLevel, Role,
    ScreeningResult,
};

/// Score a submitted questionnaire. Unanswered applicable questions count as 0.
pub fn calculate_results(
    answers: &Answers,
    catalog: &Catalog,
    profile: &ResponderProfile,
    date: DateTime<Utc>,
) -> ScreeningResult {
    let max_answer = f64::from(AnswerValue::MAX);
    let mut category_scores = BTreeMap::new();
    let mut global_weighted = 0.0;
    let mut global_max = 0.0;

    for category in Category::ALL {
        let mut current = 0.0;
        let mut max_possible = 0.0;
        let mut findings = Vec::new();

        for question in catalog.page(category, profile.role) {
            let answer = answers.get(&question.id).copied().unwrap_or_default();
            current += f64::from(answer.value()) * question.weight;
            max_possible += max_answer * question.weight;

            if answer.is_flagged() {
                findings.push(question.text.clone());
            }
        }

        let score = normalize(current, max_possible);
        let risk_level = RiskLevel::from_score(score);
        debug!(%category, score, findings = findings.len(), "scored category");

        global_weighted += current;
        global_max += max_possible;

        category_scores.insert(
            category,
            CategoryScore {
                score,
                risk_level,
                risk_label: risk_level.label().to_string(),
                findings,
            },
        );
    }

    let total_score = normalize(global_weighted, global_max);
    debug!(total_score, role = %profile.role, "scored screening");

    ScreeningResult {
        total_score,
        student_name: profile.name.clone(),
        category_scores,
        date,
        completed_by: profile.role,
        ai_analysis: None,
    }
}

/// `round(current / max * 100)`, or 0 when nothing was applicable.
pub fn normalize(current: f64, max_possible: f64) -> u8 {
    if max_possible <= 0.0 {
        return 0;
    }
    let percent = (current / max_possible * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Fail when any question asked of `role` has no answer.
pub fn require_complete(
    catalog: &Catalog,
    role: Role,
    answers: &Answers,
) -> Result<(), ScoringError> {
    let missing: Vec<String> = catalog
        .unanswered(role, answers)
        .into_iter()
        .map(|q| q.id.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ScoringError::Incomplete { missing })
    }
}

/// Admin accounts view screenings but never fill one in.
pub fn ensure_responder(role: Role) -> Result<(), ScoringError> {
    match role {
        Role::Admin => Err(ScoringError::NotAResponder(role)),
        Role::Parent | Role::Teacher => Ok(()),
    }
}
