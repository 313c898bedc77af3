use std::path::Path;
use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod face;
mod geofence;
mod model;
mod models;
mod routes;
mod service;
mod store;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::face::{LinearScanIndex, OnnxFaceEncoder};
use crate::geofence::{GeofenceValidator, OfficeAnchor};
use crate::service::attendance::AttendanceGate;
use crate::service::enrollment::EnrollmentService;
use crate::store::{
    AttendanceStore, EnrollmentStore, MySqlAttendanceStore, MySqlEnrollmentStore,
    SupabasePhotoStore,
};
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Workshop Attendance API"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;

    // Model files are a hard startup requirement; a server that cannot
    // encode faces cannot admit anyone.
    let encoder = Arc::new(
        OnnxFaceEncoder::load(Path::new(&config.face_model_dir))
            .expect("failed to load face models"),
    );

    let employees: Arc<dyn EnrollmentStore> = Arc::new(MySqlEnrollmentStore::new(pool.clone()));
    let attendance: Arc<dyn AttendanceStore> = Arc::new(MySqlAttendanceStore::new(pool.clone()));
    let photos = Arc::new(SupabasePhotoStore::new(
        &config.supabase_url,
        &config.supabase_key,
        &config.bucket_faces,
    ));
    let face_index = Arc::new(LinearScanIndex);

    let geofence = GeofenceValidator::new(OfficeAnchor {
        latitude: config.office_latitude,
        longitude: config.office_longitude,
        allowed_radius_km: config.allowed_radius_km,
    });

    let gate = Data::new(AttendanceGate::new(
        encoder.clone(),
        face_index.clone(),
        geofence,
        employees.clone(),
        attendance.clone(),
        photos.clone(),
    ));
    let enrollment = Data::new(EnrollmentService::new(
        encoder,
        face_index,
        employees.clone(),
        photos,
    ));
    let attendance_data: Data<dyn AttendanceStore> = Data::from(attendance);

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    // Warmup: confirm the matcher has something to match against.
    let employees_for_warmup = employees.clone();
    actix_web::rt::spawn(async move {
        match employees_for_warmup.get_all_with_descriptor().await {
            Ok(enrolled) => info!(count = enrolled.len(), "enrolled face descriptors loaded"),
            Err(e) => tracing::warn!(error = %e, "failed to count enrolled descriptors"),
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(gate.clone())
            .app_data(enrollment.clone())
            .app_data(attendance_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
