use std::fmt::Write;

use crate::analytics;
use crate::models::{AiAnalysis, Category, Student, StoredScreening};

/// Markdown report for one student: latest screening in detail, then history.
/// `screenings` is expected newest first.
pub fn build_report(student: &Student, screenings: &[StoredScreening]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Screening Report: {}", student.name);
    let _ = writeln!(output, "Age {}, grade {}", student.age, student.grade);
    let _ = writeln!(output);

    let Some(latest) = screenings.first() else {
        let _ = writeln!(output, "No screenings recorded for this student.");
        return output;
    };
    let result = &latest.result;

    let _ = writeln!(output, "## Latest Screening");
    let _ = writeln!(
        output,
        "Completed by {} on {}: total risk {}% ({})",
        result.completed_by,
        result.date.format("%Y-%m-%d"),
        result.total_score,
        result.risk_level().label()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "| Category | Score | Risk |");
    let _ = writeln!(output, "|---|---|---|");

    for category in Category::ALL {
        if let Some(score) = result.category_scores.get(&category) {
            let _ = writeln!(
                output,
                "| {} | {}% | {} |",
                category.label(),
                score.score,
                score.risk_label
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Flagged Findings");
    let findings = analytics::all_findings(result);

    if findings.is_empty() {
        let _ = writeln!(output, "No items were answered Often or Always.");
    } else {
        let mut current: Option<Category> = None;
        for (category, finding) in findings {
            if current != Some(category) {
                let _ = writeln!(output, "### {}", category.label());
                current = Some(category);
            }
            let _ = writeln!(output, "- {finding}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Narrative");
    let analysis = result
        .ai_analysis
        .clone()
        .unwrap_or_else(AiAnalysis::unavailable);
    let _ = writeln!(output, "{}", analysis.letter);
    let _ = writeln!(output);
    for step in &analysis.action_steps {
        let _ = writeln!(output, "- {step}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Screening History");
    for screening in screenings {
        let _ = writeln!(
            output,
            "- {} ({}): {}% {}",
            screening.result.date.format("%Y-%m-%d"),
            screening.result.completed_by,
            screening.result.total_score,
            screening.result.risk_level().label()
        );
    }

    output
}

/// Markdown overview of every screening visible to a responder.
pub fn build_summary_report(scope_label: &str, screenings: &[StoredScreening]) -> String {
    let mut output = String::new();
    let distribution = analytics::risk_distribution(screenings);

    let _ = writeln!(output, "# Screening Summary");
    let _ = writeln!(output, "Generated for {scope_label}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Distribution");

    if screenings.is_empty() {
        let _ = writeln!(output, "No screenings recorded.");
        return output;
    }

    let _ = writeln!(output, "- Düşük Risk: {}", distribution.low);
    let _ = writeln!(output, "- Orta Risk: {}", distribution.moderate);
    let _ = writeln!(output, "- Yüksek Risk: {}", distribution.high);
    if let Some(average) = analytics::average_total_score(screenings) {
        let _ = writeln!(output, "- Average total score: {average}%");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Screenings");
    for screening in analytics::highest_risk(screenings).into_iter().take(10) {
        let _ = writeln!(
            output,
            "- {} on {} by {}: {}% ({})",
            screening.result.student_name,
            screening.result.date.format("%Y-%m-%d"),
            screening.result.completed_by,
            screening.result.total_score,
            screening.result.risk_level().label()
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::models::{AnswerValue, Answers, ResponderProfile, Role};
    use crate::scoring::calculate_results;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn student() -> Student {
        Student {
            id: Uuid::new_v4(),
            parent_id: None,
            teacher_id: None,
            name: "Ali Demir".to_string(),
            age: 7,
            grade: "1".to_string(),
            gender: Some("male".to_string()),
            notes: None,
        }
    }

    fn screening(student: &Student, answer: u8) -> StoredScreening {
        let catalog = Catalog::builtin().unwrap();
        let answers: Answers = catalog
            .applicable(Role::Teacher)
            .map(|q| (q.id.clone(), AnswerValue::new(answer).unwrap()))
            .collect();
        let profile = ResponderProfile {
            name: student.name.clone(),
            age: 7,
            grade: "1".to_string(),
            role: Role::Teacher,
        };
        let date = Utc.with_ymd_and_hms(2026, 2, 10, 10, 0, 0).unwrap();
        StoredScreening {
            id: Uuid::new_v4(),
            student_id: student.id,
            result: calculate_results(&answers, &catalog, &profile, date),
        }
    }

    #[test]
    fn report_lists_categories_findings_and_placeholder() {
        let student = student();
        let report = build_report(&student, &[screening(&student, 4)]);

        assert!(report.contains("# Screening Report: Ali Demir"));
        assert!(report.contains("total risk 100% (Yüksek Risk)"));
        for category in Category::ALL {
            assert!(report.contains(category.label()));
        }
        assert!(report.contains(&AiAnalysis::unavailable().letter));
        assert!(report.contains("2026-02-10 (teacher): 100% Yüksek Risk"));
    }

    #[test]
    fn report_without_findings_says_so() {
        let student = student();
        let report = build_report(&student, &[screening(&student, 1)]);
        assert!(report.contains("No items were answered Often or Always."));
    }

    #[test]
    fn report_handles_no_screenings() {
        let report = build_report(&student(), &[]);
        assert!(report.contains("No screenings recorded for this student."));
    }

    #[test]
    fn summary_counts_tiers() {
        let student = student();
        let screenings = vec![screening(&student, 4), screening(&student, 0)];
        let summary = build_summary_report("teacher demo", &screenings);
        assert!(summary.contains("Generated for teacher demo"));
        assert!(summary.contains("- Düşük Risk: 1"));
        assert!(summary.contains("- Yüksek Risk: 1"));
        assert!(summary.contains("- Average total score: 50%"));
    }
}
