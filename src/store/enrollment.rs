//! Employee persistence behind a trait so services can run against
//! in-memory fakes in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlPool;

use crate::error::AppError;
use crate::face::matcher::EnrolledFace;
use crate::model::employee::Employee;

/// Full column set written on create/update. The service merges
/// partial updates against the current row before calling `update`,
/// so the store always writes every column.
#[derive(Debug, Clone)]
pub struct EmployeeRecord {
    pub name: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub divisi: Option<String>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub face_encoding: Option<String>,
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// All employees with a stored descriptor, ascending id. The
    /// matcher depends on this ordering for stable tie-breaks.
    async fn get_all_with_descriptor(&self) -> Result<Vec<EnrolledFace>, AppError>;

    async fn get_by_id(&self, id: u64) -> Result<Option<Employee>, AppError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<Employee>, AppError>;

    async fn list(
        &self,
        page: u32,
        per_page: u32,
        search: Option<&str>,
    ) -> Result<(Vec<Employee>, i64), AppError>;

    async fn create(&self, record: EmployeeRecord) -> Result<u64, AppError>;

    async fn update(&self, id: u64, record: EmployeeRecord) -> Result<(), AppError>;

    async fn delete(&self, id: u64) -> Result<bool, AppError>;

    /// Whether any attendance rows reference this employee.
    async fn has_attendance(&self, id: u64) -> Result<bool, AppError>;
}

pub struct MySqlEnrollmentStore {
    pool: MySqlPool,
}

impl MySqlEnrollmentStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentStore for MySqlEnrollmentStore {
    async fn get_all_with_descriptor(&self) -> Result<Vec<EnrolledFace>, AppError> {
        let rows = sqlx::query_as::<_, EnrolledFace>(
            r#"
            SELECT id, name, email, divisi, image_url, face_encoding
            FROM employees
            WHERE face_encoding IS NOT NULL
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"SELECT * FROM employees WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"SELECT * FROM employees WHERE email = ?"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn list(
        &self,
        page: u32,
        per_page: u32,
        search: Option<&str>,
    ) -> Result<(Vec<Employee>, i64), AppError> {
        let where_clause = if search.is_some() {
            "WHERE name LIKE ? OR email LIKE ? OR divisi LIKE ?"
        } else {
            ""
        };
        let like = search.map(|s| format!("%{s}%"));

        let count_sql = format!("SELECT COUNT(*) FROM employees {where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(like) = &like {
            count_query = count_query.bind(like).bind(like).bind(like);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let offset = crate::store::page_offset(page, per_page);
        let data_sql =
            format!("SELECT * FROM employees {where_clause} ORDER BY id DESC LIMIT ? OFFSET ?");
        let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
        if let Some(like) = &like {
            data_query = data_query.bind(like).bind(like).bind(like);
        }
        let employees = data_query
            .bind(per_page as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((employees, total))
    }

    async fn create(&self, record: EmployeeRecord) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees
            (name, email, date_of_birth, divisi, address, image_url, face_encoding)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(record.date_of_birth)
        .bind(&record.divisi)
        .bind(&record.address)
        .bind(&record.image_url)
        .bind(&record.face_encoding)
        .execute(&self.pool)
        .await;

        match result {
            Ok(res) => Ok(res.last_insert_id()),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
                Err(AppError::Conflict("Email already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, id: u64, record: EmployeeRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE employees
            SET name = ?, email = ?, date_of_birth = ?, divisi = ?,
                address = ?, image_url = ?, face_encoding = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(record.date_of_birth)
        .bind(&record.divisi)
        .bind(&record.address)
        .bind(&record.image_url)
        .bind(&record.face_encoding)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<bool, AppError> {
        let result = sqlx::query(r#"DELETE FROM employees WHERE id = ?"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn has_attendance(&self, id: u64) -> Result<bool, AppError> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM attendance WHERE employee_id = ?"#)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }
}
