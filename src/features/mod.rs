pub mod analysis;
pub mod quota;
