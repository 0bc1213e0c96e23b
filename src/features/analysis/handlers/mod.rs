pub mod analysis_handler;
pub mod quota_handler;

pub use analysis_handler::analyze_document;
pub use quota_handler::get_quota_status;
