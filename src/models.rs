use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnswerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Parent,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "parent" => Ok(Role::Parent),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Which responders are asked a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    Parent,
    Teacher,
    Both,
}

impl FormType {
    pub fn applies_to(self, role: Role) -> bool {
        match self {
            FormType::Both => true,
            FormType::Parent => role == Role::Parent,
            FormType::Teacher => role == Role::Teacher,
        }
    }
}

/// The six screening domains. Declaration order is the scoring order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Attention,
    Reading,
    Writing,
    Math,
    Language,
    MotorSpatial,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Attention,
        Category::Reading,
        Category::Writing,
        Category::Math,
        Category::Language,
        Category::MotorSpatial,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Attention => "attention",
            Category::Reading => "reading",
            Category::Writing => "writing",
            Category::Math => "math",
            Category::Language => "language",
            Category::MotorSpatial => "motor_spatial",
        }
    }

    /// Display label, presentation only.
    pub fn label(self) -> &'static str {
        match self {
            Category::Attention => "Dikkat & Odaklanma",
            Category::Reading => "Okuma Becerileri",
            Category::Writing => "Yazma Becerileri",
            Category::Math => "Matematiksel Algı",
            Category::Language => "İletişim & Dil",
            Category::MotorSpatial => "Motor & Uzamsal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Likert answer: 0 Never, 1 Rarely, 2 Sometimes, 3 Often, 4 Always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AnswerValue(u8);

impl AnswerValue {
    pub const NEVER: AnswerValue = AnswerValue(0);
    pub const OFTEN: AnswerValue = AnswerValue(3);
    pub const ALWAYS: AnswerValue = AnswerValue(4);
    pub const MAX: u8 = 4;

    pub fn new(value: u8) -> Result<Self, AnswerError> {
        if value > Self::MAX {
            return Err(AnswerError::OutOfRange {
                value: i64::from(value),
            });
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Often or Always.
    pub fn is_flagged(self) -> bool {
        self >= Self::OFTEN
    }
}

impl TryFrom<u8> for AnswerValue {
    type Error = AnswerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for AnswerValue {
    type Error = AnswerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(Self)
            .ok_or(AnswerError::OutOfRange { value })
    }
}

impl From<AnswerValue> for u8 {
    fn from(value: AnswerValue) -> Self {
        value.0
    }
}

/// Answers keyed by question id.
pub type Answers = HashMap<String, AnswerValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub category: Category,
    pub weight: f64,
    pub form_type: FormType,
}

impl Question {
    pub fn applies_to(&self, role: Role) -> bool {
        self.form_type.applies_to(role)
    }
}

/// The person answering the questionnaire and the child it is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponderProfile {
    pub name: String,
    pub age: u8,
    pub grade: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub const MODERATE_THRESHOLD: u8 = 35;
    pub const HIGH_THRESHOLD: u8 = 65;

    pub fn from_score(score: u8) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            RiskLevel::High
        } else if score >= Self::MODERATE_THRESHOLD {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Düşük Risk",
            RiskLevel::Moderate => "Orta Risk",
            RiskLevel::High => "Yüksek Risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: u8,
    pub risk_level: RiskLevel,
    pub risk_label: String,
    pub findings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub letter: String,
    pub action_steps: Vec<String>,
}

impl AiAnalysis {
    /// Shown in place of a narrative when generation failed or was never run.
    pub fn unavailable() -> Self {
        Self {
            letter: "Yapay zeka analizi şu anda oluşturulamadı. Skorlar ve bulgular geçerliliğini korumaktadır."
                .to_string(),
            action_steps: vec!["Lütfen daha sonra analizi yeniden oluşturmayı deneyin.".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub total_score: u8,
    pub student_name: String,
    pub category_scores: BTreeMap<Category, CategoryScore>,
    pub date: DateTime<Utc>,
    pub completed_by: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,
}

impl ScreeningResult {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.total_score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub school_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub name: String,
    pub age: i32,
    pub grade: String,
    pub gender: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredScreening {
    pub id: Uuid,
    pub student_id: Uuid,
    pub result: ScreeningResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_type_both_applies_to_every_role() {
        assert!(FormType::Both.applies_to(Role::Parent));
        assert!(FormType::Both.applies_to(Role::Teacher));
        assert!(FormType::Both.applies_to(Role::Admin));
        assert!(FormType::Parent.applies_to(Role::Parent));
        assert!(!FormType::Parent.applies_to(Role::Teacher));
        assert!(!FormType::Teacher.applies_to(Role::Parent));
    }

    #[test]
    fn answer_value_rejects_out_of_range() {
        assert!(AnswerValue::new(4).is_ok());
        assert!(AnswerValue::new(5).is_err());
        assert!(AnswerValue::try_from(-1_i64).is_err());
        assert!(serde_json::from_str::<AnswerValue>("7").is_err());
        assert_eq!(serde_json::from_str::<AnswerValue>("3").unwrap(), AnswerValue::OFTEN);
    }

    #[test]
    fn risk_level_boundaries_are_inclusive() {
        assert_eq!(RiskLevel::from_score(34), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(35), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(64), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(65), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&Category::MotorSpatial).unwrap();
        assert_eq!(json, "\"motor_spatial\"");
        assert!(serde_json::from_str::<Category>("\"music\"").is_err());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert!("student".parse::<Role>().is_err());
    }
}
