//! The question catalog: a versioned, validated, read-only list of questions.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::CatalogError;
use crate::models::{Answers, Category, Question, Role};

const BUILTIN_CATALOG: &str = include_str!("../data/questions.json");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: String,
    questions: Vec<Question>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    questions: Vec<Question>,
}

impl Catalog {
    /// Build a catalog, rejecting non-positive weights, blank fields and repeated ids.
    pub fn new(version: impl Into<String>, questions: Vec<Question>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();

        for (index, question) in questions.iter().enumerate() {
            if question.id.trim().is_empty() {
                return Err(CatalogError::EmptyField { index, field: "id" });
            }
            if question.text.trim().is_empty() {
                return Err(CatalogError::EmptyField { index, field: "text" });
            }
            if !question.weight.is_finite() || question.weight <= 0.0 {
                return Err(CatalogError::InvalidWeight {
                    id: question.id.clone(),
                    weight: question.weight,
                });
            }
            if !seen.insert(question.id.as_str()) {
                return Err(CatalogError::DuplicateId(question.id.clone()));
            }
        }

        Ok(Self {
            version: version.into(),
            questions,
        })
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Self::new(file.version, file.questions)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn applicable(&self, role: Role) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(move |q| q.applies_to(role))
    }

    /// One questionnaire page: the questions of a category asked of `role`, in catalog order.
    pub fn page(&self, category: Category, role: Role) -> impl Iterator<Item = &Question> {
        self.applicable(role).filter(move |q| q.category == category)
    }

    pub fn page_complete(&self, category: Category, role: Role, answers: &Answers) -> bool {
        self.page(category, role).all(|q| answers.contains_key(&q.id))
    }

    /// Applicable questions with no answer. Scoring counts these as 0.
    pub fn unanswered<'a>(&'a self, role: Role, answers: &'a Answers) -> Vec<&'a Question> {
        self.applicable(role)
            .filter(|q| !answers.contains_key(&q.id))
            .collect()
    }
}
