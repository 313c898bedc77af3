pub mod attendance;
pub mod enrollment;
pub mod photo;

pub use attendance::{AttendanceStore, MySqlAttendanceStore};
pub use enrollment::{EmployeeRecord, EnrollmentStore, MySqlEnrollmentStore};
pub use photo::{PhotoStore, SupabasePhotoStore};

/// OFFSET for a 1-based page, computed in i64 so extreme page numbers
/// cannot overflow the u32 arithmetic.
pub(crate) fn page_offset(page: u32, per_page: u32) -> i64 {
    (i64::from(page.max(1)) - 1) * i64::from(per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_is_zero_based_and_clamped() {
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
    }

    #[test]
    fn page_offset_survives_extreme_pages() {
        assert_eq!(
            page_offset(u32::MAX, 100),
            (i64::from(u32::MAX) - 1) * 100
        );
    }
}
