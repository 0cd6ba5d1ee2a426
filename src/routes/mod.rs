pub mod health;
pub mod health_checks;

pub use health::*;
pub use health_checks::*;
