//! Domain types shared across the record-filter workspace.
//!
//! - [`record`] - Headers and delimited records
//! - [`input`] - Input file names and the metadata encoded in them
//!
//! All public types are re-exported at the crate root:
//!
//! ```
//! use rf_core::{Header, InputName, Record};
//! ```

mod input;
mod record;

pub use input::{InputName, NAME_SEPARATOR};
pub use record::{FIELD_DELIMITER, Header, Record};
