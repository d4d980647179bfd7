//! Field extraction: monetary normalization, heuristic and delegated
//! strategies, and orientation retry scanning.

pub mod delegated;
pub mod heuristic;
pub mod money;
pub mod orientation;
pub mod patterns;

pub use delegated::{parse_statement, parse_structured, score_fields, strip_code_fences};
pub use heuristic::{extract_heuristic, infer_category};
pub use money::normalize_amount;
pub use orientation::{scan_with_rotations, Rotation, ScanOutcome, ROTATION_ORDER};
