pub mod weak_points;
