use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Budi Santoso",
        "email": "budi@bengkel.com",
        "date_of_birth": "1995-04-12",
        "divisi": "Mechanic",
        "address": "Jl. Kebon Jeruk No. 12, Jakarta",
        "image_url": "https://xyz.supabase.co/storage/v1/object/public/faces/abc.jpg"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Budi Santoso")]
    pub name: String,

    #[schema(example = "budi@bengkel.com", format = "email")]
    pub email: String,

    #[schema(example = "1995-04-12", value_type = String, format = "date", nullable = true)]
    pub date_of_birth: Option<NaiveDate>,

    #[schema(example = "Mechanic", nullable = true)]
    pub divisi: Option<String>,

    #[schema(nullable = true)]
    pub address: Option<String>,

    /// Reference photo in the photo store.
    #[schema(nullable = true)]
    pub image_url: Option<String>,

    /// Serialized face descriptor; never sent to clients.
    #[serde(skip_serializing)]
    #[schema(hidden = true)]
    pub face_encoding: Option<String>,
}
