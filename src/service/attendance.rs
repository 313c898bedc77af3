//! Attendance gate: the check-in/check-out state machine.
//!
//! Per (employee, date) the states are NoRecord, CheckedIn and
//! CheckedOut, in that order, with no undo transition. Identity and
//! location are verified independently on every transition; the photo
//! upload happens before any row is written so an aborted request
//! never leaves a half-filled record.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::face::matcher::{FaceIndex, FaceMatch};
use crate::face::FaceEncoder;
use crate::geofence::{Coordinate, GeofenceResult, GeofenceValidator, LocationSample};
use crate::service::encode_off_thread;
use crate::store::{AttendanceStore, EnrollmentStore, PhotoStore};

/// One inbound check-in or check-out request.
pub struct CheckRequest {
    pub image: Vec<u8>,
    pub latitude: Coordinate,
    pub longitude: Coordinate,
    pub position: Option<LocationSample>,
    /// Client-supplied hint; the matched identity is authoritative.
    pub claimed_employee_id: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MatchedEmployee {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub divisi: Option<String>,
    #[schema(example = 0.82)]
    pub confidence: f64,
}

impl From<&FaceMatch> for MatchedEmployee {
    fn from(m: &FaceMatch) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            email: m.email.clone(),
            divisi: m.divisi.clone(),
            confidence: m.confidence,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckinResponse {
    pub attendance_id: u64,
    pub employee: MatchedEmployee,
    #[schema(value_type = String, format = "date-time")]
    pub checkin_time: NaiveDateTime,
    pub location: GeofenceResult,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub attendance_id: u64,
    pub employee: MatchedEmployee,
    #[schema(value_type = String, format = "date-time")]
    pub checkin_time: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub checkout_time: NaiveDateTime,
    /// `HH:MM:SS` between check-in and check-out.
    #[schema(example = "08:30:00")]
    pub work_duration: String,
    pub location: GeofenceResult,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OfficeLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

pub struct AttendanceGate {
    encoder: Arc<dyn FaceEncoder>,
    index: Arc<dyn FaceIndex>,
    geofence: GeofenceValidator,
    employees: Arc<dyn EnrollmentStore>,
    attendance: Arc<dyn AttendanceStore>,
    photos: Arc<dyn PhotoStore>,
}

impl AttendanceGate {
    pub fn new(
        encoder: Arc<dyn FaceEncoder>,
        index: Arc<dyn FaceIndex>,
        geofence: GeofenceValidator,
        employees: Arc<dyn EnrollmentStore>,
        attendance: Arc<dyn AttendanceStore>,
        photos: Arc<dyn PhotoStore>,
    ) -> Self {
        Self {
            encoder,
            index,
            geofence,
            employees,
            attendance,
            photos,
        }
    }

    pub fn office_location(&self) -> OfficeLocation {
        let anchor = self.geofence.anchor();
        OfficeLocation {
            latitude: anchor.latitude,
            longitude: anchor.longitude,
            radius_km: anchor.allowed_radius_km,
        }
    }

    /// NoRecord -> CheckedIn.
    pub async fn check_in(&self, req: CheckRequest) -> Result<CheckinResponse, AppError> {
        let matched = self.verify_identity(&req).await?;
        let location = self
            .geofence
            .validate(&req.latitude, &req.longitude, req.position.as_ref())?;

        let now = Local::now().naive_local();
        let today = now.date();

        let existing = self
            .attendance
            .get_by_employee_and_date(matched.id, today)
            .await?;
        if existing.as_ref().is_some_and(|a| a.checkin_time.is_some()) {
            return Err(AppError::Conflict("Already checked in today".to_string()));
        }

        // Upload before persisting: an aborted upload must not leave a row.
        let image_url = self.photos.upload(&req.image).await?;

        let attendance_id = match existing {
            // a row without checkin_time only comes from legacy imports
            Some(record) => {
                self.attendance
                    .update_checkin(
                        record.id,
                        now,
                        req.latitude.value(),
                        req.longitude.value(),
                        &image_url,
                    )
                    .await?;
                record.id
            }
            None => {
                self.attendance
                    .create_checkin(
                        matched.id,
                        today,
                        now,
                        req.latitude.value(),
                        req.longitude.value(),
                        &image_url,
                    )
                    .await?
            }
        };

        tracing::info!(
            employee_id = matched.id,
            attendance_id,
            distance_km = location.distance_km,
            "check-in recorded"
        );

        Ok(CheckinResponse {
            attendance_id,
            employee: MatchedEmployee::from(&matched),
            checkin_time: now,
            location,
            message: "Check-in successful".to_string(),
        })
    }

    /// CheckedIn -> CheckedOut. Face and location are re-verified;
    /// check-out never trusts the check-in's identity or coordinates.
    pub async fn check_out(&self, req: CheckRequest) -> Result<CheckoutResponse, AppError> {
        let matched = self.verify_identity(&req).await?;
        let location = self
            .geofence
            .validate(&req.latitude, &req.longitude, req.position.as_ref())?;

        let now = Local::now().naive_local();
        let today = now.date();

        let record = self
            .attendance
            .get_by_employee_and_date(matched.id, today)
            .await?;
        let Some(record) = record else {
            return Err(AppError::Conflict(
                "Must check-in first before check-out".to_string(),
            ));
        };
        let Some(checkin_time) = record.checkin_time else {
            return Err(AppError::Conflict(
                "Must check-in first before check-out".to_string(),
            ));
        };
        if record.checkout_time.is_some() {
            return Err(AppError::Conflict("Already checked out today".to_string()));
        }

        let image_url = self.photos.upload(&req.image).await?;

        self.attendance
            .update_checkout(
                record.id,
                now,
                req.latitude.value(),
                req.longitude.value(),
                &image_url,
            )
            .await?;

        let work_duration = format_work_duration(checkin_time, now);

        tracing::info!(
            employee_id = matched.id,
            attendance_id = record.id,
            %work_duration,
            "check-out recorded"
        );

        Ok(CheckoutResponse {
            attendance_id: record.id,
            employee: MatchedEmployee::from(&matched),
            checkin_time,
            checkout_time: now,
            work_duration,
            location,
            message: "Check-out successful".to_string(),
        })
    }

    /// Resolve who is in the photo. The matcher's answer wins over any
    /// client-supplied employee id; a mismatching hint is logged and
    /// ignored.
    async fn verify_identity(&self, req: &CheckRequest) -> Result<FaceMatch, AppError> {
        let probe = encode_off_thread(&self.encoder, req.image.clone()).await?;
        let enrolled = self.employees.get_all_with_descriptor().await?;
        let matched = self.index.find_match(&probe, &enrolled)?;

        if let Some(claimed) = req.claimed_employee_id {
            if claimed != matched.id {
                tracing::warn!(
                    claimed,
                    matched = matched.id,
                    "claimed employee id does not match recognized face; using matched identity"
                );
            }
        }

        Ok(matched)
    }
}

/// Elapsed time between check-in and check-out as `HH:MM:SS`.
fn format_work_duration(checkin: NaiveDateTime, checkout: NaiveDateTime) -> String {
    let total = (checkout - checkin).num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
