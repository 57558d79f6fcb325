pub mod admin;
pub mod applications;
pub mod members;
pub mod recovery;
