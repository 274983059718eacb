pub mod mocks;
pub mod wars;
