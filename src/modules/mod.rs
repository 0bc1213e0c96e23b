//! Modules layer - Infrastructure components for external integrations
//!
//! Contains local adapters the request pipeline hands work to: temporary
//! on-disk staging of uploads and document text extraction.

pub mod extraction;
pub mod staging;
