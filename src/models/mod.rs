// Re-export all model types
pub use self::booking::*;
pub use self::enums::*;
pub use self::errors::*;
pub use self::menu::*;
pub use self::user::*;
pub use self::validation::*;

mod booking;
mod enums;
mod errors;
mod menu;
mod user;
mod validation;
