//! Cell addressing, tagged values and literal storage

mod address;
mod store;
mod value;

pub use address::{CellAddress, CellRef, Sheet};
pub use store::{CellReader, CellStore};
pub use value::{coerce_number, parse_leading_number, CellValue};
