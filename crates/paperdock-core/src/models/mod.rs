pub mod category;
pub mod document;
pub mod file_type;
pub mod job;

pub use category::Category;
pub use document::{Document, DocumentStatus, ProcessingResults, ScanRecord};
pub use file_type::FileType;
pub use job::IngestJob;
