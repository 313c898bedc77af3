use crate::api::attendance::AttendanceQuery;
use crate::api::employee::EmployeeQuery;
use crate::face::matcher::FaceMatch;
use crate::geofence::{GeofenceResult, LocationSample};
use crate::model::attendance::Attendance;
use crate::model::employee::Employee;
use crate::service::attendance::{
    CheckinResponse, CheckoutResponse, MatchedEmployee, OfficeLocation,
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Workshop Attendance API",
        version = "1.0.0",
        description = r#"
## Workshop Attendance System

This API powers a workshop attendance backend where identity is proven
with a **face photo** and presence is proven with a **geofenced GPS fix**.

### 🔹 Key Features
- **Employee Management**
  - Register employees with a reference photo, update profiles, re-enroll faces
- **Face Verification**
  - Resolve which enrolled employee appears in a photo
- **Attendance**
  - Daily check-in and check-out, gated by face match + office geofence
  - Location spoof heuristics reject fabricated GPS fixes

### 🔐 Security
All endpoints are protected with **JWT Bearer authentication**.
Employee management endpoints additionally require the **Admin** role.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, **ONNX Runtime**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::office_location,
        crate::api::attendance::list_attendance,
        crate::api::attendance::get_attendance,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::verify_face
    ),
    components(
        schemas(
            Employee,
            Attendance,
            AttendanceQuery,
            EmployeeQuery,
            CheckinResponse,
            CheckoutResponse,
            OfficeLocation,
            MatchedEmployee,
            FaceMatch,
            GeofenceResult,
            LocationSample
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Face + geofence gated attendance APIs"),
        (name = "Employee", description = "Employee enrollment and management APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
