//! Employee enrollment: registration with mandatory descriptor
//! extraction, photo-driven descriptor refresh, and delete protection.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::AppError;
use crate::face::matcher::{FaceIndex, FaceMatch};
use crate::face::FaceEncoder;
use crate::model::employee::Employee;
use crate::service::encode_off_thread;
use crate::store::enrollment::{EmployeeRecord, EnrollmentStore};
use crate::store::PhotoStore;

pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub divisi: Option<String>,
    pub address: Option<String>,
}

#[derive(Default)]
pub struct EmployeeUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub divisi: Option<String>,
    pub address: Option<String>,
}

pub struct EnrollmentService {
    encoder: Arc<dyn FaceEncoder>,
    index: Arc<dyn FaceIndex>,
    employees: Arc<dyn EnrollmentStore>,
    photos: Arc<dyn PhotoStore>,
}

impl EnrollmentService {
    pub fn new(
        encoder: Arc<dyn FaceEncoder>,
        index: Arc<dyn FaceIndex>,
        employees: Arc<dyn EnrollmentStore>,
        photos: Arc<dyn PhotoStore>,
    ) -> Self {
        Self {
            encoder,
            index,
            employees,
            photos,
        }
    }

    /// Register an employee. The reference photo must contain a
    /// recognizable face; enrollment without a descriptor would make
    /// the employee invisible to the matcher.
    pub async fn create(&self, new: NewEmployee, image: Vec<u8>) -> Result<Employee, AppError> {
        if self.employees.get_by_email(&new.email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let descriptor = encode_off_thread(&self.encoder, image.clone()).await?;
        let image_url = self.photos.upload(&image).await?;

        let id = self
            .employees
            .create(EmployeeRecord {
                name: new.name,
                email: new.email,
                date_of_birth: new.date_of_birth,
                divisi: new.divisi,
                address: new.address,
                image_url: Some(image_url),
                face_encoding: Some(descriptor.to_csv()),
            })
            .await?;

        tracing::info!(employee_id = id, "employee enrolled");

        self.employees
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("Employee vanished after insert".to_string()))
    }

    /// Update profile fields; a new photo re-extracts the descriptor.
    pub async fn update(
        &self,
        id: u64,
        changes: EmployeeUpdate,
        image: Option<Vec<u8>>,
    ) -> Result<Employee, AppError> {
        let current = self
            .employees
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;

        if let Some(email) = &changes.email {
            if email != &current.email && self.employees.get_by_email(email).await?.is_some() {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
        }

        let (image_url, face_encoding) = match image {
            Some(image) => {
                let descriptor = encode_off_thread(&self.encoder, image.clone()).await?;
                let url = self.photos.upload(&image).await?;
                (Some(url), Some(descriptor.to_csv()))
            }
            None => (current.image_url.clone(), current.face_encoding.clone()),
        };

        let record = EmployeeRecord {
            name: changes.name.unwrap_or(current.name),
            email: changes.email.unwrap_or(current.email),
            date_of_birth: changes.date_of_birth.or(current.date_of_birth),
            divisi: changes.divisi.or(current.divisi),
            address: changes.address.or(current.address),
            image_url,
            face_encoding,
        };

        self.employees.update(id, record).await?;

        self.employees
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))
    }

    /// Delete an employee with no dependent attendance rows. Removing
    /// the orphaned reference photo is best effort only.
    pub async fn delete(&self, id: u64) -> Result<(), AppError> {
        let employee = self
            .employees
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;

        if self.employees.has_attendance(id).await? {
            return Err(AppError::Conflict(
                "Cannot delete employee with attendance records".to_string(),
            ));
        }

        if !self.employees.delete(id).await? {
            return Err(AppError::Internal("Failed to delete employee".to_string()));
        }

        if let Some(url) = &employee.image_url {
            if let Err(e) = self.photos.delete(url).await {
                tracing::warn!(employee_id = id, error = %e, "failed to delete orphaned photo");
            }
        }

        Ok(())
    }

    pub async fn get(&self, id: u64) -> Result<Employee, AppError> {
        self.employees
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))
    }

    pub async fn list(
        &self,
        page: u32,
        per_page: u32,
        search: Option<&str>,
    ) -> Result<(Vec<Employee>, i64), AppError> {
        self.employees.list(page, per_page, search).await
    }

    /// Standalone identity check: who is in this photo?
    pub async fn verify(&self, image: Vec<u8>) -> Result<FaceMatch, AppError> {
        let probe = encode_off_thread(&self.encoder, image).await?;
        let enrolled = self.employees.get_all_with_descriptor().await?;
        Ok(self.index.find_match(&probe, &enrolled)?)
    }
}
