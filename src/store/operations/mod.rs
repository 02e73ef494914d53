pub mod courses;
pub mod weak_points;
