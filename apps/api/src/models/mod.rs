pub mod proposal;
pub mod session;
