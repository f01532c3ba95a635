pub mod create;
pub mod extract;
pub mod info;
pub mod list;

pub use create::run as create;
pub use extract::run as extract;
pub use info::run as info;
pub use list::run as list;
