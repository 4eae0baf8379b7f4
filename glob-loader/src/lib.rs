pub mod commands;
pub mod loader;
pub mod shared;

pub use loader::load;

pub mod prelude {
    pub use crate::commands::*;
    pub use crate::loader::prelude::*;
    pub use crate::shared::prelude::*;
}
