pub mod detect;
pub mod health;
pub mod upload;
