pub mod error;
pub mod normalize;
pub mod reader;
pub mod screen;
pub mod submit;

pub use error::{ImportError, Result};
pub use normalize::{normalize_table, NormalizedRow};
pub use reader::{read_table, CellValue, RawTable};
pub use screen::screen_rows;
pub use submit::{assemble_submission, default_selection};
