mod install;
mod ledger;
mod pi;
mod spawn;
mod terminal_title;

pub use install::*;
pub use ledger::*;
pub use pi::*;
pub use spawn::*;
pub use terminal_title::*;
