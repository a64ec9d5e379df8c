// Bounded real-time sample streams for equipment monitoring
// Library entry point

pub mod core;

// Re-export main types
pub use crate::core::error::{Result, StreamError};
pub use crate::core::format::{
    validate_signals, Distribution, Sample, SignalConfig, SignalWindow, StreamFrame, StreamOptions,
};
pub use crate::core::source::{FeedSender, SampleSource};
pub use crate::core::stream::{RunState, SampleStream, StreamHandle, Subscription};
pub use crate::core::window::SampleWindow;
pub use crate::core::data_handle::handle_ws_stream;
