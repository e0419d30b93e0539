pub mod config;
pub mod error;
pub mod expression;
pub mod matcher;
pub mod pipeline;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod session;
pub mod storage;
pub mod template;

pub use error::{Error, Result};
pub use pipeline::Pipeline;
pub use plugin::{Distance, Initializer, Transform};
pub use plugins::neclatent::{Algorithm, MIN_SCORE};
pub use plugins::PluginContext;
pub use registry::Registry;
pub use session::SdkSession;
pub use template::{FileMeta, Mat, PixelFormat, Template};

// Re-export the vendor boundary for convenience
pub use neclatent_sdk::{LatentSdk, SdkError};
