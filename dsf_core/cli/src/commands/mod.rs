pub mod debug;
pub mod operation;
pub mod project;
pub mod relations;
pub mod run;

pub use debug::handle_debug;
pub use operation::handle_operation;
pub use relations::{handle_describe, handle_ls, handle_rename};
pub use run::handle_run;
