pub mod driver;
pub mod principal;
pub mod ride;
