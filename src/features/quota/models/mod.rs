mod quota_decision;
mod quota_record;

pub use quota_decision::QuotaDecision;
pub use quota_record::QuotaRecord;
