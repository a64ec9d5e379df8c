pub mod constants;
pub mod data_handle;
pub mod error;
pub mod format;
pub mod source;
pub mod stream;
pub mod window;
