// LiveStage API Library
//
// HTTP surface for stream lifecycle and stage operations

pub mod http;

// Re-export commonly used types
pub use http::{create_router, AppState};
