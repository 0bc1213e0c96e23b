mod quota_sweeper;

pub use quota_sweeper::QuotaSweeper;
