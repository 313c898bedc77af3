use actix_multipart::form::MultipartForm;
use actix_multipart::form::bytes::Bytes;
use actix_multipart::form::text::Text;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::geofence::{Coordinate, LocationSample};
use crate::model::attendance::Attendance;
use crate::model::role::Role;
use crate::service::attendance::{
    AttendanceGate, CheckRequest, CheckinResponse, CheckoutResponse, OfficeLocation,
};
use crate::store::AttendanceStore;

/// Multipart payload shared by check-in and check-out. Coordinates
/// stay text until validation: the fake-GPS heuristics inspect the
/// client's exact decimal representation.
#[derive(Debug, MultipartForm)]
pub struct AttendanceForm {
    #[multipart(limit = "10MiB")]
    pub photo: Bytes,
    pub latitude: Text<String>,
    pub longitude: Text<String>,
    /// Optional hint; the recognized face is authoritative.
    pub employee_id: Option<Text<u64>>,
    /// JSON-encoded GeolocationPosition details for spoof detection.
    pub position: Option<Text<String>>,
}

fn into_check_request(form: AttendanceForm) -> Result<CheckRequest, AppError> {
    let latitude = Coordinate::parse(&form.latitude.0)
        .map_err(|_| AppError::Validation("Invalid latitude".to_string()))?;
    let longitude = Coordinate::parse(&form.longitude.0)
        .map_err(|_| AppError::Validation("Invalid longitude".to_string()))?;

    let position = form
        .position
        .map(|p| serde_json::from_str::<LocationSample>(&p.0))
        .transpose()
        .map_err(|e| AppError::Validation(format!("Invalid position payload: {e}")))?;

    Ok(CheckRequest {
        image: form.photo.data.to_vec(),
        latitude,
        longitude,
        position,
        claimed_employee_id: form.employee_id.map(|t| t.0),
    })
}

/// Check-in endpoint: multipart body with `photo`, `latitude`,
/// `longitude` and optional `employee_id`/`position` fields.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    responses(
        (status = 200, description = "Checked in successfully", body = CheckinResponse),
        (status = 400, description = "Face/location verification failed", body = Object, example = json!({
            "message": "Face not recognized"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    gate: web::Data<AttendanceGate>,
    MultipartForm(form): MultipartForm<AttendanceForm>,
) -> Result<impl Responder, AppError> {
    let resp = gate.check_in(into_check_request(form)?).await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// Check-out endpoint, same multipart shape as check-in.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    responses(
        (status = 200, description = "Checked out successfully", body = CheckoutResponse),
        (status = 400, description = "Face/location verification failed"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "No check-in yet, or already checked out", body = Object, example = json!({
            "message": "Already checked out today"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    gate: web::Data<AttendanceGate>,
    MultipartForm(form): MultipartForm<AttendanceForm>,
) -> Result<impl Responder, AppError> {
    let resp = gate.check_out(into_check_request(form)?).await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// Office anchor so clients can render the allowed zone.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/office-location",
    responses(
        (status = 200, description = "Office anchor", body = OfficeLocation)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn office_location(gate: web::Data<AttendanceGate>) -> impl Responder {
    HttpResponse::Ok().json(gate.office_location())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttendanceQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub employee_id: Option<u64>,
}

/// Paginated attendance list. Employees only see their own rows.
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(
        ("page", Query, description = "Page number"),
        ("per_page", Query, description = "Items per page"),
        ("employee_id", Query, description = "Filter by employee (admin only)")
    ),
    responses(
        (status = 200, description = "Paginated attendance records"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Token has no linked employee record")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    query: web::Query<AttendanceQuery>,
) -> Result<impl Responder, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let employee_id = list_scope(&auth, query.employee_id)?;
    let (records, total) = store.list(page, per_page, employee_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "data": records,
        "page": page,
        "per_page": per_page,
        "total": total,
    })))
}

/// Which employee filter a caller is allowed to list with. Employees
/// are always pinned to their own record; a token without a linked
/// employee id must not fall through to an unscoped listing.
fn list_scope(auth: &AuthUser, requested: Option<u64>) -> Result<Option<u64>, AppError> {
    if auth.role != Role::Employee {
        return Ok(requested);
    }
    match auth.employee_id {
        Some(own) => Ok(Some(own)),
        None => Err(AppError::Forbidden(
            "No employee record linked to this account".to_string(),
        )),
    }
}

/// Single attendance record, with ownership enforced for employees.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/{id}",
    params(
        ("id", Path, description = "Attendance record ID")
    ),
    responses(
        (status = 200, description = "Attendance record", body = Attendance),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Attendance record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_attendance(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();

    let record = store
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))?;

    if auth.role == Role::Employee && auth.employee_id != Some(record.employee_id) {
        return Err(AppError::Forbidden(
            "Not allowed to view this record".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(record))
}
