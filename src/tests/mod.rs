pub mod expiry_tests;
pub mod replay_tests;
