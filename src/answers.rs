use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::catalog::Catalog;
use crate::error::AnswerError;
use crate::models::{AnswerValue, Answers};

/// Parse `{ "att_1": 3, "rd_2": 0, ... }`.
pub fn from_json(raw: &str) -> Result<Answers, AnswerError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(entries) = value else {
        return Err(AnswerError::NotAnObject);
    };

    let mut answers = Answers::with_capacity(entries.len());
    for (id, raw_value) in entries {
        let number = raw_value.as_i64().ok_or_else(|| AnswerError::NotAnInteger {
            id: id.clone(),
            raw: raw_value.to_string(),
        })?;
        let answer = AnswerValue::try_from(number).map_err(|source| AnswerError::Invalid {
            id: id.clone(),
            source: Box::new(source),
        })?;
        answers.insert(id, answer);
    }

    Ok(answers)
}

/// Parse a CSV with `question_id,answer` headers.
pub fn from_csv<R: Read>(reader: R) -> Result<Answers, AnswerError> {
    #[derive(Deserialize)]
    struct CsvRow {
        question_id: String,
        answer: String,
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut answers = Answers::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let number: i64 = row.answer.parse().map_err(|_| AnswerError::NotAnInteger {
            id: row.question_id.clone(),
            raw: row.answer.clone(),
        })?;
        let answer = AnswerValue::try_from(number).map_err(|source| AnswerError::Invalid {
            id: row.question_id.clone(),
            source: Box::new(source),
        })?;
        if answers.insert(row.question_id.clone(), answer).is_some() {
            return Err(AnswerError::DuplicateAnswer(row.question_id));
        }
    }

    Ok(answers)
}

/// Load an answer sheet, choosing the parser by file extension.
pub fn from_path(path: &Path) -> anyhow::Result<Answers> {
    use anyhow::Context;

    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let answers = if is_csv {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        from_csv(file)?
    } else {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        from_json(&raw)?
    };

    Ok(answers)
}

/// Answer ids that match no catalog question, sorted.
pub fn unknown_answer_ids(catalog: &Catalog, answers: &Answers) -> Vec<String> {
    let mut unknown: Vec<String> = answers
        .keys()
        .filter(|id| catalog.get(id).is_none())
        .cloned()
        .collect();
    unknown.sort();
    unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_sheet() {
        let answers = from_json(r#"{"att_1": 3, "rd_1": 0}"#).unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers["att_1"], AnswerValue::OFTEN);
        assert_eq!(answers["rd_1"], AnswerValue::NEVER);
    }

    #[test]
    fn rejects_out_of_range_json_answer() {
        let err = from_json(r#"{"att_1": 5}"#).unwrap_err();
        assert!(matches!(err, AnswerError::Invalid { ref id, .. } if id == "att_1"));
        let err = from_json(r#"{"att_1": -1}"#).unwrap_err();
        assert!(matches!(err, AnswerError::Invalid { .. }));
    }

    #[test]
    fn rejects_fractional_and_non_object_sheets() {
        assert!(matches!(
            from_json(r#"{"att_1": 2.5}"#),
            Err(AnswerError::NotAnInteger { .. })
        ));
        assert!(matches!(from_json("[1, 2]"), Err(AnswerError::NotAnObject)));
    }

    #[test]
    fn parses_csv_sheet() {
        let raw = "question_id,answer\natt_1,4\nrd_2, 1\n";
        let answers = from_csv(raw.as_bytes()).unwrap();
        assert_eq!(answers["att_1"], AnswerValue::ALWAYS);
        assert_eq!(answers["rd_2"].value(), 1);
    }

    #[test]
    fn rejects_duplicate_csv_rows() {
        let raw = "question_id,answer\natt_1,4\natt_1,2\n";
        assert!(matches!(
            from_csv(raw.as_bytes()),
            Err(AnswerError::DuplicateAnswer(id)) if id == "att_1"
        ));
    }

    #[test]
    fn reports_unknown_ids() {
        let catalog = Catalog::builtin().unwrap();
        let answers = from_json(r#"{"att_1": 1, "zzz": 2, "aaa": 0}"#).unwrap();
        assert_eq!(unknown_answer_ids(&catalog, &answers), vec!["aaa", "zzz"]);
    }
}
