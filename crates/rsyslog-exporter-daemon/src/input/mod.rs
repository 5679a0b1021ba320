//! stdin side of the exporter: line framing and the silence-aware read loop.

pub mod pump;
pub mod reader;

pub use pump::{Exit, InputLoop};
pub use reader::extract_json;
