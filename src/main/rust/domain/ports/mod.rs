mod encoder;
mod image_provider;
mod metrics_reporter;
mod relay_process;
mod signals;
mod transport;

pub use encoder::Encoder;
pub use image_provider::{ImageProvider, TextRenderer};
pub use metrics_reporter::MetricsReporter;
pub use relay_process::RelayProcess;
pub use signals::{PipelineSignal, SignalReceiver, SignalSender};
pub use transport::{Transport, TransportLink};
