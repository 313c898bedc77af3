use actix_multipart::form::MultipartForm;
use actix_multipart::form::bytes::Bytes;
use actix_multipart::form::text::Text;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::face::matcher::FaceMatch;
use crate::model::employee::Employee;
use crate::service::enrollment::{EmployeeUpdate, EnrollmentService, NewEmployee};

/// Registration payload: profile fields plus the reference photo the
/// descriptor is extracted from.
#[derive(Debug, MultipartForm)]
pub struct CreateEmployeeForm {
    #[multipart(limit = "10MiB")]
    pub photo: Bytes,
    pub name: Text<String>,
    pub email: Text<String>,
    pub date_of_birth: Option<Text<NaiveDate>>,
    pub divisi: Option<Text<String>>,
    pub address: Option<Text<String>>,
}

#[derive(Debug, MultipartForm)]
pub struct UpdateEmployeeForm {
    /// New reference photo; triggers descriptor re-extraction.
    #[multipart(limit = "10MiB")]
    pub photo: Option<Bytes>,
    pub name: Option<Text<String>>,
    pub email: Option<Text<String>>,
    pub date_of_birth: Option<Text<NaiveDate>>,
    pub divisi: Option<Text<String>>,
    pub address: Option<Text<String>>,
}

#[derive(Debug, MultipartForm)]
pub struct VerifyFaceForm {
    #[multipart(limit = "10MiB")]
    pub photo: Bytes,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

/// Register Employee
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    responses(
        (status = 200, description = "Employee registered successfully", body = Employee),
        (status = 400, description = "No usable face in the reference photo", body = Object, example = json!({
            "message": "No face detected in the image"
        })),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    auth: AuthUser,
    service: web::Data<EnrollmentService>,
    MultipartForm(form): MultipartForm<CreateEmployeeForm>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;

    let new = NewEmployee {
        name: form.name.0,
        email: form.email.0,
        date_of_birth: form.date_of_birth.map(|t| t.0),
        divisi: form.divisi.map(|t| t.0),
        address: form.address.map(|t| t.0),
    };

    let employee = service.create(new, form.photo.data.to_vec()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee registered successfully",
        "data": employee,
    })))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(
        ("page", Query, description = "Page number"),
        ("per_page", Query, description = "Items per page"),
        ("search", Query, description = "Search by name, email or division")
    ),
    responses(
        (status = 200, description = "Paginated employee list")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn list_employees(
    service: web::Data<EnrollmentService>,
    query: web::Query<EmployeeQuery>,
) -> Result<impl Responder, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let (employees, total) = service.list(page, per_page, query.search.as_deref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "data": employees,
        "page": page,
        "per_page": per_page,
        "total": total,
    })))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/v1/employees/{id}",
    params(
        ("id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    service: web::Data<EnrollmentService>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    let employee = service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/v1/employees/{id}",
    params(
        ("id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee updated successfully", body = Employee),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Email already exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    service: web::Data<EnrollmentService>,
    path: web::Path<u64>,
    MultipartForm(form): MultipartForm<UpdateEmployeeForm>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;

    let changes = EmployeeUpdate {
        name: form.name.map(|t| t.0),
        email: form.email.map(|t| t.0),
        date_of_birth: form.date_of_birth.map(|t| t.0),
        divisi: form.divisi.map(|t| t.0),
        address: form.address.map(|t| t.0),
    };
    let image = form.photo.map(|p| p.data.to_vec());

    let employee = service.update(path.into_inner(), changes, image).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully",
        "data": employee,
    })))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{id}",
    params(
        ("id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Employee deleted successfully"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee still has attendance records")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn delete_employee(
    auth: AuthUser,
    service: web::Data<EnrollmentService>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;

    service.delete(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deleted successfully"
    })))
}

/// Verify Face: resolve which enrolled employee is in the photo.
#[utoipa::path(
    post,
    path = "/api/v1/employees/verify-face",
    responses(
        (status = 200, description = "Face recognized", body = FaceMatch),
        (status = 400, description = "No face detected, or not recognized", body = Object, example = json!({
            "message": "Face not recognized"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn verify_face(
    service: web::Data<EnrollmentService>,
    MultipartForm(form): MultipartForm<VerifyFaceForm>,
) -> Result<impl Responder, AppError> {
    let matched = service.verify(form.photo.data.to_vec()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Face recognized",
        "data": matched,
    })))
}
