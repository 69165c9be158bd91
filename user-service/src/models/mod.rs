mod address;
mod user;

pub use address::*;
pub use user::*;
