use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Geofence anchor: attendance is only accepted inside this circle.
    // Missing or unparseable values are a startup failure, never a
    // per-request one.
    pub office_latitude: f64,
    pub office_longitude: f64,
    pub allowed_radius_km: f64,

    // Face model assets (ONNX detector + descriptor network)
    pub face_model_dir: String,

    // Supabase storage for attendance/reference photos
    pub supabase_url: String,
    pub supabase_key: String,
    pub bucket_faces: String,

    // Rate limiting
    pub rate_attendance_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            office_latitude: env::var("OFFICE_LATITUDE")
                .expect("OFFICE_LATITUDE must be set")
                .parse()
                .expect("OFFICE_LATITUDE must be a valid number"),
            office_longitude: env::var("OFFICE_LONGITUDE")
                .expect("OFFICE_LONGITUDE must be set")
                .parse()
                .expect("OFFICE_LONGITUDE must be a valid number"),
            allowed_radius_km: env::var("ALLOWED_RADIUS_KM")
                .expect("ALLOWED_RADIUS_KM must be set")
                .parse()
                .expect("ALLOWED_RADIUS_KM must be a valid number"),

            face_model_dir: env::var("FACE_MODEL_DIR").unwrap_or_else(|_| "models-face".to_string()),

            supabase_url: env::var("SUPABASE_URL").expect("SUPABASE_URL must be set"),
            supabase_key: env::var("SUPABASE_KEY").expect("SUPABASE_KEY must be set"),
            bucket_faces: env::var("BUCKET_FACES").unwrap_or_else(|_| "faces".to_string()),

            rate_attendance_per_min: env::var("RATE_ATTENDANCE_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
        }
    }
}
