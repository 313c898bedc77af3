//! Attendance persistence. The table carries a unique key on
//! `(employee_id, date)`; the duplicate-key error class (23000) is
//! mapped to the duplicate check-in conflict so a race between two
//! concurrent check-ins can never create two rows.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;

use crate::error::AppError;
use crate::model::attendance::Attendance;

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn get_by_employee_and_date(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, AppError>;

    async fn create_checkin(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveDateTime,
        latitude: f64,
        longitude: f64,
        image_url: &str,
    ) -> Result<u64, AppError>;

    /// Legacy path: fill in check-in fields on a pre-existing row.
    async fn update_checkin(
        &self,
        id: u64,
        time: NaiveDateTime,
        latitude: f64,
        longitude: f64,
        image_url: &str,
    ) -> Result<(), AppError>;

    async fn update_checkout(
        &self,
        id: u64,
        time: NaiveDateTime,
        latitude: f64,
        longitude: f64,
        image_url: &str,
    ) -> Result<(), AppError>;

    async fn get_by_id(&self, id: u64) -> Result<Option<Attendance>, AppError>;

    async fn list(
        &self,
        page: u32,
        per_page: u32,
        employee_id: Option<u64>,
    ) -> Result<(Vec<Attendance>, i64), AppError>;
}

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn get_by_employee_and_date(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, AppError> {
        let record = sqlx::query_as::<_, Attendance>(
            r#"SELECT * FROM attendance WHERE employee_id = ? AND date = ?"#,
        )
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn create_checkin(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveDateTime,
        latitude: f64,
        longitude: f64,
        image_url: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
            (employee_id, date, checkin_time, checkin_latitude, checkin_longitude, checkin_image_url)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(time)
        .bind(latitude)
        .bind(longitude)
        .bind(image_url)
        .execute(&self.pool)
        .await;

        match result {
            Ok(res) => Ok(res.last_insert_id()),
            // Duplicate (employee_id, date): somebody else checked in first
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
                Err(AppError::Conflict("Already checked in today".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_checkin(
        &self,
        id: u64,
        time: NaiveDateTime,
        latitude: f64,
        longitude: f64,
        image_url: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE attendance
            SET checkin_time = ?, checkin_latitude = ?, checkin_longitude = ?, checkin_image_url = ?
            WHERE id = ?
            "#,
        )
        .bind(time)
        .bind(latitude)
        .bind(longitude)
        .bind(image_url)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_checkout(
        &self,
        id: u64,
        time: NaiveDateTime,
        latitude: f64,
        longitude: f64,
        image_url: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE attendance
            SET checkout_time = ?, checkout_latitude = ?, checkout_longitude = ?, checkout_image_url = ?
            WHERE id = ?
            "#,
        )
        .bind(time)
        .bind(latitude)
        .bind(longitude)
        .bind(image_url)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Attendance>, AppError> {
        let record = sqlx::query_as::<_, Attendance>(r#"SELECT * FROM attendance WHERE id = ?"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn list(
        &self,
        page: u32,
        per_page: u32,
        employee_id: Option<u64>,
    ) -> Result<(Vec<Attendance>, i64), AppError> {
        let where_clause = if employee_id.is_some() {
            "WHERE employee_id = ?"
        } else {
            ""
        };

        let count_sql = format!("SELECT COUNT(*) FROM attendance {where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(id) = employee_id {
            count_query = count_query.bind(id);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let offset = crate::store::page_offset(page, per_page);
        let data_sql = format!(
            "SELECT * FROM attendance {where_clause} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut data_query = sqlx::query_as::<_, Attendance>(&data_sql);
        if let Some(id) = employee_id {
            data_query = data_query.bind(id);
        }
        let records = data_query
            .bind(per_page as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((records, total))
    }
}
