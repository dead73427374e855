pub mod attempt;
pub mod identity;
pub mod reliability;
pub mod user;
