
/// Functionality shared by tracking channels regardless of GNSS system
pub mod tracking;

pub mod galileo_e1;
