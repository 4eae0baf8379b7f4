mod dump;
mod list;

pub use dump::{dump_modules, DumpArgs, DumpEntry};
pub use list::{list_modules, summarize, ListArgs};
