mod display;
mod hook;
mod parse;
mod records;
mod titles;
mod types;

pub use display::*;
pub use hook::*;
pub use parse::*;
pub use records::*;
pub use titles::*;
pub use types::*;
