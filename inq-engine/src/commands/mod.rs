//! The five user-facing commands
//!
//! Each command works against an `IntelligenceRepository` and returns a
//! report; printing is left to the binary.

pub mod classify;
pub mod dump;
pub mod scan;
pub mod status;
pub mod visualize;

pub use classify::{classify, ClassifyReport, ClassifyRequest};
pub use dump::{dump, dump_to};
pub use scan::scan;
pub use status::{status, StatusReport, StatusRow};
pub use visualize::{visualize, visualize_to, VisualNode, REPORT_FILE_NAME};
