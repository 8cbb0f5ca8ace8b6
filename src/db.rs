use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    AiAnalysis, Category, CategoryScore, Role, ScreeningResult, Student, StoredScreening, User,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Demo accounts: one parent, one teacher, and three students split between them.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let parent_id = Uuid::parse_str("6f1c2a4e-7d0b-4c55-9e61-2b8f3a9d1c01")?;
    let teacher_id = Uuid::parse_str("b2e4d6f8-1a3c-4e5f-8a7b-9c0d1e2f3a02")?;

    let users = vec![
        (parent_id, "Demo Veli", "veli@demo.com", Role::Parent, None),
        (
            teacher_id,
            "Demo Öğretmen",
            "ogretmen@demo.com",
            Role::Teacher,
            Some("Atatürk İlkokulu"),
        ),
    ];

    for (id, name, email, role, school_name) in users {
        sqlx::query(
            r#"
            INSERT INTO mindscreen.users (id, name, email, role, school_name)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name, school_name = EXCLUDED.school_name
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role.as_str())
        .bind(school_name)
        .execute(pool)
        .await?;
    }

    let students = vec![
        Student {
            id: Uuid::parse_str("0a9b8c7d-6e5f-4a3b-9c2d-1e0f9a8b7c11")?,
            parent_id: Some(parent_id),
            teacher_id: None,
            name: "Can Yılmaz".to_string(),
            age: 8,
            grade: "2".to_string(),
            gender: Some("male".to_string()),
            notes: Some("Okumada biraz yavaş.".to_string()),
        },
        Student {
            id: Uuid::parse_str("1b2c3d4e-5f60-4a7b-8c9d-0e1f2a3b4c12")?,
            parent_id: None,
            teacher_id: Some(teacher_id),
            name: "Zeynep Kaya".to_string(),
            age: 7,
            grade: "1".to_string(),
            gender: Some("female".to_string()),
            notes: None,
        },
        Student {
            id: Uuid::parse_str("2c3d4e5f-6071-4b8c-9d0e-1f2a3b4c5d13")?,
            parent_id: None,
            teacher_id: Some(teacher_id),
            name: "Ali Demir".to_string(),
            age: 7,
            grade: "1".to_string(),
            gender: Some("male".to_string()),
            notes: None,
        },
    ];

    for student in students {
        sqlx::query(
            r#"
            INSERT INTO mindscreen.students
            (id, parent_id, teacher_id, name, age, grade, gender, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(student.id)
        .bind(student.parent_id)
        .bind(student.teacher_id)
        .bind(&student.name)
        .bind(student.age)
        .bind(&student.grade)
        .bind(&student.gender)
        .bind(&student.notes)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Look up an account by email and role; no credential check is involved.
pub async fn find_user(pool: &PgPool, email: &str, role: Role) -> anyhow::Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, name, email, role, school_name FROM mindscreen.users \
         WHERE email = $1 AND role = $2",
    )
    .bind(email)
    .bind(role.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(|row| -> anyhow::Result<User> {
        let raw_role: String = row.try_get("role")?;
        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            role: parse_role(&raw_role)?,
            school_name: row.try_get("school_name")?,
        })
    })
    .transpose()
}

pub async fn add_student(pool: &PgPool, student: &Student) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO mindscreen.students
        (id, parent_id, teacher_id, name, age, grade, gender, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(student.id)
    .bind(student.parent_id)
    .bind(student.teacher_id)
    .bind(&student.name)
    .bind(student.age)
    .bind(&student.grade)
    .bind(&student.gender)
    .bind(&student.notes)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

const STUDENT_COLUMNS: &str = "id, parent_id, teacher_id, name, age, grade, gender, notes";

pub async fn fetch_student(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Student>> {
    let query = format!("SELECT {STUDENT_COLUMNS} FROM mindscreen.students WHERE id = $1");
    let row = sqlx::query_as::<_, StudentRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Student::from))
}

/// Parents see their own children, teachers their own students, admins everyone.
pub async fn fetch_students(pool: &PgPool, user_id: Uuid, role: Role) -> anyhow::Result<Vec<Student>> {
    let mut query = format!("SELECT {STUDENT_COLUMNS} FROM mindscreen.students");
    match role {
        Role::Parent => query.push_str(" WHERE parent_id = $1"),
        Role::Teacher => query.push_str(" WHERE teacher_id = $1"),
        Role::Admin => {}
    }
    query.push_str(" ORDER BY created_at DESC");

    let mut rows = sqlx::query_as::<_, StudentRow>(&query);
    if role != Role::Admin {
        rows = rows.bind(user_id);
    }

    Ok(rows
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Student::from)
        .collect())
}

pub async fn insert_screening(
    pool: &PgPool,
    student_id: Uuid,
    result: &ScreeningResult,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO mindscreen.screenings
        (id, student_id, completed_by_role, total_score, category_scores, ai_analysis, date)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(student_id)
    .bind(result.completed_by.as_str())
    .bind(i16::from(result.total_score))
    .bind(Json(&result.category_scores))
    .bind(result.ai_analysis.as_ref().map(Json))
    .bind(result.date)
    .execute(pool)
    .await
    .context("failed to store screening")?;

    Ok(id)
}

/// Which screenings a listing covers.
#[derive(Debug, Clone, Copy)]
pub enum ScreeningScope {
    Responder { user_id: Uuid, role: Role },
    Student(Uuid),
}

/// Screenings visible to `scope`, newest first.
pub async fn fetch_screenings(
    pool: &PgPool,
    scope: ScreeningScope,
) -> anyhow::Result<Vec<StoredScreening>> {
    let mut query = String::from(
        "SELECT s.id, s.student_id, st.name AS student_name, s.completed_by_role, \
         s.total_score, s.category_scores, s.ai_analysis, s.date \
         FROM mindscreen.screenings s \
         JOIN mindscreen.students st ON st.id = s.student_id",
    );

    let bound = match scope {
        ScreeningScope::Student(student_id) => {
            query.push_str(" WHERE s.student_id = $1");
            Some(student_id)
        }
        ScreeningScope::Responder {
            user_id,
            role: Role::Parent,
        } => {
            query.push_str(" WHERE st.parent_id = $1");
            Some(user_id)
        }
        ScreeningScope::Responder {
            user_id,
            role: Role::Teacher,
        } => {
            query.push_str(" WHERE st.teacher_id = $1");
            Some(user_id)
        }
        ScreeningScope::Responder {
            role: Role::Admin, ..
        } => None,
    };
    query.push_str(" ORDER BY s.date DESC");

    let mut rows = sqlx::query_as::<_, ScreeningRow>(&query);
    if let Some(value) = bound {
        rows = rows.bind(value);
    }

    rows.fetch_all(pool)
        .await?
        .into_iter()
        .map(StoredScreening::try_from)
        .collect()
}

/// Attach a narrative to a stored screening. Scores are never rewritten.
pub async fn update_analysis(
    pool: &PgPool,
    screening_id: Uuid,
    analysis: &AiAnalysis,
) -> anyhow::Result<bool> {
    let result = sqlx::query("UPDATE mindscreen.screenings SET ai_analysis = $1 WHERE id = $2")
        .bind(Json(analysis))
        .bind(screening_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn parse_role(raw: &str) -> anyhow::Result<Role> {
    raw.parse::<Role>().map_err(anyhow::Error::msg)
}

#[derive(sqlx::FromRow)]
struct StudentRow {
    id: Uuid,
    parent_id: Option<Uuid>,
    teacher_id: Option<Uuid>,
    name: String,
    age: i32,
    grade: String,
    gender: Option<String>,
    notes: Option<String>,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: row.id,
            parent_id: row.parent_id,
            teacher_id: row.teacher_id,
            name: row.name,
            age: row.age,
            grade: row.grade,
            gender: row.gender,
            notes: row.notes,
        }
    }
}

/// Column-for-column shape of a joined screening row.
#[derive(sqlx::FromRow)]
struct ScreeningRow {
    id: Uuid,
    student_id: Uuid,
    student_name: String,
    completed_by_role: String,
    total_score: i16,
    category_scores: Json<BTreeMap<Category, CategoryScore>>,
    ai_analysis: Option<Json<AiAnalysis>>,
    date: DateTime<Utc>,
}

impl TryFrom<ScreeningRow> for StoredScreening {
    type Error = anyhow::Error;

    fn try_from(row: ScreeningRow) -> Result<Self, Self::Error> {
        let total_score = u8::try_from(row.total_score)
            .ok()
            .filter(|score| *score <= 100)
            .with_context(|| format!("screening {} has total score {}", row.id, row.total_score))?;

        let category_scores = row.category_scores.0;
        if let Some(missing) = Category::ALL
            .into_iter()
            .find(|category| !category_scores.contains_key(category))
        {
            anyhow::bail!("screening {} is missing category '{missing}'", row.id);
        }

        Ok(StoredScreening {
            id: row.id,
            student_id: row.student_id,
            result: ScreeningResult {
                total_score,
                student_name: row.student_name,
                category_scores,
                date: row.date,
                completed_by: parse_role(&row.completed_by_role)?,
                ai_analysis: row.ai_analysis.map(|json| json.0),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;

    fn row(total_score: i16, categories: &[Category]) -> ScreeningRow {
        let category_scores = categories
            .iter()
            .map(|category| {
                (
                    *category,
                    CategoryScore {
                        score: 20,
                        risk_level: RiskLevel::Low,
                        risk_label: RiskLevel::Low.label().to_string(),
                        findings: Vec::new(),
                    },
                )
            })
            .collect();

        ScreeningRow {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            student_name: "Can Yılmaz".to_string(),
            completed_by_role: "parent".to_string(),
            total_score,
            category_scores: Json(category_scores),
            ai_analysis: None,
            date: Utc::now(),
        }
    }

    #[test]
    fn maps_complete_row() {
        let stored = StoredScreening::try_from(row(20, &Category::ALL)).unwrap();
        assert_eq!(stored.result.total_score, 20);
        assert_eq!(stored.result.completed_by, Role::Parent);
        assert_eq!(stored.result.category_scores.len(), 6);
        assert!(stored.result.ai_analysis.is_none());
    }

    #[test]
    fn rejects_row_missing_a_category() {
        let err = StoredScreening::try_from(row(20, &Category::ALL[..5])).unwrap_err();
        assert!(err.to_string().contains("motor_spatial"));
    }

    #[test]
    fn rejects_out_of_range_total() {
        assert!(StoredScreening::try_from(row(101, &Category::ALL)).is_err());
        assert!(StoredScreening::try_from(row(-3, &Category::ALL)).is_err());
    }

    #[test]
    fn category_scores_round_trip_through_json_column() {
        let stored = StoredScreening::try_from(row(20, &Category::ALL)).unwrap();
        let encoded = serde_json::to_value(&stored.result.category_scores).unwrap();
        assert!(encoded.get("motor_spatial").is_some());
        assert_eq!(encoded["reading"]["risk_level"], "low");
    }
}
