pub mod directory;

pub use directory::{Role, User, UserDirectory};
