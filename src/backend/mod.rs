pub mod chrome;

pub use chrome::ChromeBackend;
