pub mod codegen;
pub mod recorder;
pub mod resolver;

mod error;

pub use error::ShortenError;
pub use recorder::{ClickMetadata, ClickRecorder, RecordOutcome};
pub use resolver::LinkResolver;
