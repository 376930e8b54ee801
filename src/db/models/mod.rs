pub mod attendance_document;

pub use attendance_document::StoredAttendance;
