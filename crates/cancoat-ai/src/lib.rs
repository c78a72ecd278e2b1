//! Coating-chemistry classification: prompt rendering, a chat-completion
//! transport with bounded retry, and the sequential batch driver.

pub mod batch;
pub mod classify;
pub mod pause;
pub mod prompt;
pub mod transport;

pub use batch::{classify_records, skip_classification};
pub use classify::{ClassifierSettings, CoatingClassifier, Verdict};
pub use pause::{Pause, TokioPause};
pub use transport::{ChatTransport, ClassifyError, OpenRouterClient, OpenRouterConfig};
