//! In-memory fakes for the store and encoder seams.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::AppError;
use crate::face::descriptor::{DESCRIPTOR_DIM, FaceDescriptor};
use crate::face::engine::{FaceEncoder, FaceError};
use crate::face::matcher::EnrolledFace;
use crate::model::attendance::Attendance;
use crate::model::employee::Employee;
use crate::store::attendance::AttendanceStore;
use crate::store::enrollment::{EmployeeRecord, EnrollmentStore};
use crate::store::photo::PhotoStore;

/// Descriptor that is all zeros except the first component.
pub fn descriptor(first: f64) -> FaceDescriptor {
    let mut values = vec![0.0; DESCRIPTOR_DIM];
    values[0] = first;
    FaceDescriptor::new(values).unwrap()
}

/// Encoder returning a fixed descriptor for any input.
pub struct StubEncoder(pub FaceDescriptor);

impl FaceEncoder for StubEncoder {
    fn encode(&self, _image_bytes: &[u8]) -> Result<FaceDescriptor, FaceError> {
        Ok(self.0.clone())
    }
}

/// Encoder that never finds a face.
pub struct NoFaceEncoder;

impl FaceEncoder for NoFaceEncoder {
    fn encode(&self, _image_bytes: &[u8]) -> Result<FaceDescriptor, FaceError> {
        Err(FaceError::NoFaceDetected)
    }
}

pub struct InMemoryEmployees {
    rows: Mutex<Vec<Employee>>,
    next_id: AtomicU64,
}

impl InMemoryEmployees {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_enrolled(faces: Vec<(u64, &str, FaceDescriptor)>) -> Self {
        let store = Self::new();
        {
            let mut rows = store.rows.lock().unwrap();
            for (id, name, d) in &faces {
                rows.push(Employee {
                    id: *id,
                    name: name.to_string(),
                    email: format!("{}@bengkel.com", name.to_lowercase().replace(' ', ".")),
                    date_of_birth: None,
                    divisi: None,
                    address: None,
                    image_url: None,
                    face_encoding: Some(d.to_csv()),
                });
            }
        }
        let max_id = faces.iter().map(|(id, _, _)| *id).max().unwrap_or(0);
        store.next_id.store(max_id + 1, Ordering::SeqCst);
        store
    }

    pub fn get(&self, id: u64) -> Option<Employee> {
        self.rows.lock().unwrap().iter().find(|e| e.id == id).cloned()
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryEmployees {
    async fn get_all_with_descriptor(&self) -> Result<Vec<EnrolledFace>, AppError> {
        let mut faces: Vec<EnrolledFace> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| {
                e.face_encoding.as_ref().map(|enc| EnrolledFace {
                    id: e.id,
                    name: e.name.clone(),
                    email: e.email.clone(),
                    divisi: e.divisi.clone(),
                    image_url: e.image_url.clone(),
                    face_encoding: enc.clone(),
                })
            })
            .collect();
        faces.sort_by_key(|f| f.id);
        Ok(faces)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Employee>, AppError> {
        Ok(self.get(id))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Employee>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.email == email)
            .cloned())
    }

    async fn list(
        &self,
        _page: u32,
        _per_page: u32,
        search: Option<&str>,
    ) -> Result<(Vec<Employee>, i64), AppError> {
        let rows = self.rows.lock().unwrap();
        let filtered: Vec<Employee> = rows
            .iter()
            .filter(|e| search.is_none_or(|s| e.name.contains(s) || e.email.contains(s)))
            .cloned()
            .collect();
        let total = filtered.len() as i64;
        Ok((filtered, total))
    }

    async fn create(&self, record: EmployeeRecord) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|e| e.email == record.email) {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        rows.push(Employee {
            id,
            name: record.name,
            email: record.email,
            date_of_birth: record.date_of_birth,
            divisi: record.divisi,
            address: record.address,
            image_url: record.image_url,
            face_encoding: record.face_encoding,
        });
        Ok(id)
    }

    async fn update(&self, id: u64, record: EmployeeRecord) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(e) = rows.iter_mut().find(|e| e.id == id) {
            e.name = record.name;
            e.email = record.email;
            e.date_of_birth = record.date_of_birth;
            e.divisi = record.divisi;
            e.address = record.address;
            e.image_url = record.image_url;
            e.face_encoding = record.face_encoding;
        }
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|e| e.id != id);
        Ok(rows.len() < before)
    }

    async fn has_attendance(&self, _id: u64) -> Result<bool, AppError> {
        Ok(false)
    }
}

/// Employee store whose `has_attendance` always answers yes, for
/// delete-protection tests.
pub struct EmployeesWithAttendance(pub InMemoryEmployees);

#[async_trait]
impl EnrollmentStore for EmployeesWithAttendance {
    async fn get_all_with_descriptor(&self) -> Result<Vec<EnrolledFace>, AppError> {
        self.0.get_all_with_descriptor().await
    }
    async fn get_by_id(&self, id: u64) -> Result<Option<Employee>, AppError> {
        self.0.get_by_id(id).await
    }
    async fn get_by_email(&self, email: &str) -> Result<Option<Employee>, AppError> {
        self.0.get_by_email(email).await
    }
    async fn list(
        &self,
        page: u32,
        per_page: u32,
        search: Option<&str>,
    ) -> Result<(Vec<Employee>, i64), AppError> {
        self.0.list(page, per_page, search).await
    }
    async fn create(&self, record: EmployeeRecord) -> Result<u64, AppError> {
        self.0.create(record).await
    }
    async fn update(&self, id: u64, record: EmployeeRecord) -> Result<(), AppError> {
        self.0.update(id, record).await
    }
    async fn delete(&self, id: u64) -> Result<bool, AppError> {
        self.0.delete(id).await
    }
    async fn has_attendance(&self, _id: u64) -> Result<bool, AppError> {
        Ok(true)
    }
}

/// Attendance store enforcing the (employee_id, date) uniqueness the
/// real table gets from its unique key.
pub struct InMemoryAttendance {
    rows: Mutex<Vec<Attendance>>,
    next_id: AtomicU64,
}

impl InMemoryAttendance {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// The single stored record; panics unless exactly one exists.
    pub fn only_record(&self) -> Attendance {
        let rows = self.rows.lock().unwrap();
        assert_eq!(rows.len(), 1, "expected exactly one attendance record");
        rows[0].clone()
    }
}

#[async_trait]
impl AttendanceStore for InMemoryAttendance {
    async fn get_by_employee_and_date(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.employee_id == employee_id && r.date == date)
            .cloned())
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
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.employee_id == employee_id && r.date == date)
        {
            return Err(AppError::Conflict("Already checked in today".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        rows.push(Attendance {
            id,
            employee_id,
            date,
            checkin_time: Some(time),
            checkin_latitude: Some(latitude),
            checkin_longitude: Some(longitude),
            checkin_image_url: Some(image_url.to_string()),
            checkout_time: None,
            checkout_latitude: None,
            checkout_longitude: None,
            checkout_image_url: None,
        });
        Ok(id)
    }

    async fn update_checkin(
        &self,
        id: u64,
        time: NaiveDateTime,
        latitude: f64,
        longitude: f64,
        image_url: &str,
    ) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(r) = rows.iter_mut().find(|r| r.id == id) {
            r.checkin_time = Some(time);
            r.checkin_latitude = Some(latitude);
            r.checkin_longitude = Some(longitude);
            r.checkin_image_url = Some(image_url.to_string());
        }
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
        let mut rows = self.rows.lock().unwrap();
        if let Some(r) = rows.iter_mut().find(|r| r.id == id) {
            r.checkout_time = Some(time);
            r.checkout_latitude = Some(latitude);
            r.checkout_longitude = Some(longitude);
            r.checkout_image_url = Some(image_url.to_string());
        }
        Ok(())
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Attendance>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list(
        &self,
        _page: u32,
        _per_page: u32,
        employee_id: Option<u64>,
    ) -> Result<(Vec<Attendance>, i64), AppError> {
        let rows = self.rows.lock().unwrap();
        let filtered: Vec<Attendance> = rows
            .iter()
            .filter(|r| employee_id.is_none_or(|id| r.employee_id == id))
            .cloned()
            .collect();
        let total = filtered.len() as i64;
        Ok((filtered, total))
    }
}

/// Photo store that fabricates URLs and counts calls; optionally
/// fails every upload to exercise the upload-then-persist ordering.
pub struct CountingPhotos {
    uploads: AtomicU64,
    deleted: Mutex<Vec<String>>,
    fail_uploads: bool,
}

impl CountingPhotos {
    pub fn new() -> Self {
        Self {
            uploads: AtomicU64::new(0),
            deleted: Mutex::new(Vec::new()),
            fail_uploads: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::new()
        }
    }

    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn deleted_urls(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhotoStore for CountingPhotos {
    async fn upload(&self, _bytes: &[u8]) -> Result<String, AppError> {
        if self.fail_uploads {
            return Err(AppError::Internal("Photo upload failed".to_string()));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("https://photos.test/{n}.jpg"))
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        self.deleted.lock().unwrap().push(url.to_string());
        Ok(())
    }
}
