//! Fixtures shared by the SDK's unit tests

pub use tuenti_api::testing::RecordingTransport;

pub const BASE_URL: &str = "http://api.example.com";
pub const CLIENT_ID: &str = "my-app";
pub const CLIENT_SECRET: &str = "my-secret";
