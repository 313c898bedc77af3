use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One row per (employee, date); the unique key on that pair is what
/// makes concurrent duplicate check-ins impossible.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "2024-01-10", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub checkin_time: Option<NaiveDateTime>,
    pub checkin_latitude: Option<f64>,
    pub checkin_longitude: Option<f64>,
    pub checkin_image_url: Option<String>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub checkout_time: Option<NaiveDateTime>,
    pub checkout_latitude: Option<f64>,
    pub checkout_longitude: Option<f64>,
    pub checkout_image_url: Option<String>,
}
