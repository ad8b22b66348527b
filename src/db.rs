use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::grade_map::parse_score_text;
use crate::models::{
    AttendanceRecord, AttendanceStatus, ClassSnapshot, EnrollmentSnapshot, GradeRecord,
    GradeStructure, Quarter,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const SEED_STRUCTURE: &str = r#"{"categories":[
    {"id":"ww","label":"Written Works","weight":0.3,"tasks":[
        {"id":"quiz1","label":"Quiz 1","total":10},
        {"id":"quiz2","label":"Quiz 2","total":10}]},
    {"id":"pt","label":"Performance Tasks","weight":0.4,"tasks":[
        {"id":"project1","label":"Group Project","total":20}]},
    {"id":"qe","label":"Quarterly Exam","weight":0.3,"tasks":[
        {"id":"exam","label":"Quarterly Exam","total":50}]}
]}"#;

async fn upsert_student(conn: &mut PgConnection, full_name: &str, email: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO gradebook.students (id, full_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET full_name = EXCLUDED.full_name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .fetch_one(&mut *conn)
    .await?
    .get("id");
    Ok(id)
}

async fn class_id(conn: &mut PgConnection, code: &str) -> anyhow::Result<Uuid> {
    let row = sqlx::query("SELECT id FROM gradebook.classes WHERE code = $1")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?
        .with_context(|| format!("class '{code}' does not exist"))?;
    Ok(row.get("id"))
}

async fn ensure_enrollment(conn: &mut PgConnection, student_id: Uuid, class_id: Uuid) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO gradebook.enrollments (id, student_id, class_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (student_id, class_id) DO UPDATE SET student_id = EXCLUDED.student_id
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(class_id)
    .fetch_one(&mut *conn)
    .await?
    .get("id");
    Ok(id)
}

/// Inserts or rescores a grade. Rescoring keeps `seq`, so the
/// chronological order used for trend prediction is unaffected.
async fn upsert_grade(
    conn: &mut PgConnection,
    enrollment_id: Uuid,
    assignment_key: &str,
    score: Option<f64>,
    total_score: f64,
    quarter: Quarter,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO gradebook.grades
        (id, enrollment_id, assignment_key, score, total_score, quarter)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (enrollment_id, assignment_key, quarter) DO UPDATE
        SET score = EXCLUDED.score, total_score = EXCLUDED.total_score, updated_at = clock_timestamp()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(enrollment_id)
    .bind(assignment_key)
    .bind(score)
    .bind(total_score)
    .bind(quarter.number())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

async fn upsert_attendance(
    conn: &mut PgConnection,
    enrollment_id: Uuid,
    date: NaiveDate,
    status: AttendanceStatus,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO gradebook.attendance_records (id, enrollment_id, date, status)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (enrollment_id, date) DO UPDATE SET status = EXCLUDED.status
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(enrollment_id)
    .bind(date)
    .bind(status.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO gradebook.classes
        (id, code, subject, teacher_name, school_year, semester, grade_structure)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (code) DO UPDATE SET grade_structure = EXCLUDED.grade_structure
        "#,
    )
    .bind(Uuid::parse_str("6b0d2c1e-5f1a-4c51-9a55-0f3a2d9e7c41")?)
    .bind("MATH-7A")
    .bind("Mathematics 7")
    .bind("Rosa Santos")
    .bind("2026-2027")
    .bind("1")
    .bind(SEED_STRUCTURE)
    .execute(&mut *tx)
    .await?;
    let class = class_id(&mut tx, "MATH-7A").await?;

    let students = [
        ("Avery Lee", "avery.lee@example.com"),
        ("Jules Moreno", "jules.moreno@example.com"),
        ("Kiara Patel", "kiara.patel@example.com"),
    ];
    let mut enrollments = HashMap::new();
    for (name, email) in students {
        let student = upsert_student(&mut tx, name, email).await?;
        let enrollment = ensure_enrollment(&mut tx, student, class).await?;
        enrollments.insert(email, enrollment);
    }

    let grades = [
        ("avery.lee@example.com", "quiz1", Some(9.0), 10.0, Quarter::First),
        ("avery.lee@example.com", "quiz2", Some(10.0), 10.0, Quarter::First),
        ("avery.lee@example.com", "project1", Some(18.0), 20.0, Quarter::First),
        ("avery.lee@example.com", "exam", Some(46.0), 50.0, Quarter::First),
        ("avery.lee@example.com", "quiz1", Some(9.0), 10.0, Quarter::Second),
        ("jules.moreno@example.com", "quiz1", Some(8.0), 10.0, Quarter::First),
        ("jules.moreno@example.com", "quiz2", Some(7.0), 10.0, Quarter::First),
        ("jules.moreno@example.com", "project1", None, 20.0, Quarter::First),
        ("kiara.patel@example.com", "quiz1", Some(5.0), 10.0, Quarter::First),
        ("kiara.patel@example.com", "quiz2", Some(0.0), 10.0, Quarter::First),
        ("kiara.patel@example.com", "project1", Some(11.0), 20.0, Quarter::First),
    ];
    for (email, key, score, total, quarter) in grades {
        upsert_grade(&mut tx, enrollments[email], key, score, total, quarter).await?;
    }

    let first_day = NaiveDate::from_ymd_opt(2026, 8, 3).context("invalid date")?;
    let attendance = [
        ("avery.lee@example.com", [AttendanceStatus::Present; 5]),
        (
            "jules.moreno@example.com",
            [
                AttendanceStatus::Present,
                AttendanceStatus::Late,
                AttendanceStatus::Present,
                AttendanceStatus::Excused,
                AttendanceStatus::Present,
            ],
        ),
        (
            "kiara.patel@example.com",
            [
                AttendanceStatus::Absent,
                AttendanceStatus::Present,
                AttendanceStatus::Absent,
                AttendanceStatus::Present,
                AttendanceStatus::Late,
            ],
        ),
    ];
    for (email, statuses) in attendance {
        for (offset, status) in statuses.into_iter().enumerate() {
            let date = first_day + chrono::Duration::days(offset as i64);
            upsert_attendance(&mut tx, enrollments[email], date, status).await?;
        }
    }

    tx.commit().await?;
    tracing::info!(class = "MATH-7A", students = students.len(), "seed data written");
    Ok(())
}

/// Loads structure, enrollments, grades and attendance for one class from a
/// single repeatable-read transaction, so every figure computed from the
/// snapshot sees the same data.
pub async fn fetch_class_snapshot(pool: &PgPool, class_code: &str) -> anyhow::Result<ClassSnapshot> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    let class = sqlx::query(
        "SELECT id, code, subject, teacher_name, school_year, semester, grade_structure \
         FROM gradebook.classes WHERE code = $1",
    )
    .bind(class_code)
    .fetch_optional(&mut *tx)
    .await?
    .with_context(|| format!("class '{class_code}' does not exist"))?;
    let class_id: Uuid = class.get("id");
    let raw_structure: String = class.get("grade_structure");
    let structure = GradeStructure::from_json(&raw_structure)
        .with_context(|| format!("class '{class_code}' has an unreadable grade structure"))?;

    let grade_rows = sqlx::query(
        "SELECT g.enrollment_id, g.assignment_key, g.score, g.total_score, g.quarter, \
         g.seq, g.created_at, g.updated_at \
         FROM gradebook.grades g \
         JOIN gradebook.enrollments e ON e.id = g.enrollment_id \
         WHERE e.class_id = $1 \
         ORDER BY g.seq",
    )
    .bind(class_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut grades: HashMap<Uuid, Vec<GradeRecord>> = HashMap::new();
    for row in grade_rows {
        let quarter: i16 = row.get("quarter");
        let record = GradeRecord {
            enrollment_id: row.get("enrollment_id"),
            assignment_key: row.get("assignment_key"),
            score: row.get("score"),
            total_score: row.get("total_score"),
            quarter: Quarter::try_from(quarter)?,
            sequence: row.get("seq"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
            updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        };
        grades.entry(record.enrollment_id).or_default().push(record);
    }

    let attendance_rows = sqlx::query(
        "SELECT a.enrollment_id, a.date, a.status \
         FROM gradebook.attendance_records a \
         JOIN gradebook.enrollments e ON e.id = a.enrollment_id \
         WHERE e.class_id = $1 \
         ORDER BY a.date",
    )
    .bind(class_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut attendance: HashMap<Uuid, Vec<AttendanceRecord>> = HashMap::new();
    for row in attendance_rows {
        let status: String = row.get("status");
        let record = AttendanceRecord {
            enrollment_id: row.get("enrollment_id"),
            date: row.get("date"),
            status: status.parse()?,
        };
        attendance.entry(record.enrollment_id).or_default().push(record);
    }

    let enrollment_rows = sqlx::query(
        "SELECT e.id, s.full_name, s.email \
         FROM gradebook.enrollments e \
         JOIN gradebook.students s ON s.id = e.student_id \
         WHERE e.class_id = $1 \
         ORDER BY s.full_name",
    )
    .bind(class_id)
    .fetch_all(&mut *tx)
    .await?;

    let enrollments = enrollment_rows
        .into_iter()
        .map(|row| {
            let enrollment_id: Uuid = row.get("id");
            EnrollmentSnapshot {
                enrollment_id,
                student_name: row.get("full_name"),
                student_email: row.get("email"),
                grades: grades.remove(&enrollment_id).unwrap_or_default(),
                attendance: attendance.remove(&enrollment_id).unwrap_or_default(),
            }
        })
        .collect::<Vec<_>>();

    tx.commit().await?;

    tracing::debug!(
        class = class_code,
        enrollments = enrollments.len(),
        "class snapshot loaded"
    );

    Ok(ClassSnapshot {
        class_code: class.get("code"),
        subject: class.get("subject"),
        teacher_name: class.get("teacher_name"),
        school_year: class.get("school_year"),
        semester: class.get("semester"),
        structure,
        enrollments,
    })
}

#[derive(serde::Deserialize)]
struct GradeCsvRow {
    full_name: String,
    email: String,
    class_code: String,
    assignment_key: String,
    score: String,
    total_score: f64,
    quarter: i16,
}

/// Imports grade rows. Blank or non-numeric score cells are stored as
/// ungraded rather than rejected.
pub async fn import_grades_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut tx = pool.begin().await?;
    let mut written = 0usize;

    for (line, result) in reader.deserialize::<GradeCsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid grade row {}", line + 1))?;
        let quarter = Quarter::try_from(row.quarter)
            .with_context(|| format!("invalid grade row {}", line + 1))?;
        let score = parse_score_text(&row.score);
        if score.is_none() && !row.score.trim().is_empty() {
            tracing::warn!(
                email = %row.email,
                assignment = %row.assignment_key,
                value = %row.score,
                "non-numeric score stored as ungraded"
            );
        }

        let student = upsert_student(&mut tx, &row.full_name, &row.email).await?;
        let class = class_id(&mut tx, &row.class_code).await?;
        let enrollment = ensure_enrollment(&mut tx, student, class).await?;
        if upsert_grade(&mut tx, enrollment, &row.assignment_key, score, row.total_score, quarter).await?
            > 0
        {
            written += 1;
        }
    }

    tx.commit().await?;
    Ok(written)
}

#[derive(serde::Deserialize)]
struct AttendanceCsvRow {
    full_name: String,
    email: String,
    class_code: String,
    date: NaiveDate,
    status: String,
}

pub async fn import_attendance_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut tx = pool.begin().await?;
    let mut written = 0usize;

    for (line, result) in reader.deserialize::<AttendanceCsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid attendance row {}", line + 1))?;
        let status: AttendanceStatus = row
            .status
            .parse()
            .with_context(|| format!("invalid attendance row {}", line + 1))?;

        let student = upsert_student(&mut tx, &row.full_name, &row.email).await?;
        let class = class_id(&mut tx, &row.class_code).await?;
        let enrollment = ensure_enrollment(&mut tx, student, class).await?;
        if upsert_attendance(&mut tx, enrollment, row.date, status).await? > 0 {
            written += 1;
        }
    }

    tx.commit().await?;
    Ok(written)
}
