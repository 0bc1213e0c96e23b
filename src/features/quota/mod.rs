pub mod dtos;
pub mod models;
pub mod services;
pub mod workers;

pub use services::QuotaService;
pub use workers::QuotaSweeper;
