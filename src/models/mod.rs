pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod filters;
pub mod review;
pub mod symptom;
pub mod user;

pub use appointment::*;
pub use doctor::*;
pub use enums::*;
pub use filters::*;
pub use review::*;
pub use symptom::*;
pub use user::*;
