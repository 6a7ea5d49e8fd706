pub mod agreements;
pub mod lifecycle;
pub mod loans;
pub mod state;
pub mod users;
