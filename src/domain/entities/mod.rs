pub mod credit;
pub mod identity;
