mod delivery_log;
mod trigger;
mod user;

pub use delivery_log::*;
pub use trigger::*;
pub use user::*;
