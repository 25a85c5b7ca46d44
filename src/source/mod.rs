//! Sample source subsystem

pub mod adapter;
pub mod driver;
pub mod frame;
pub mod replay;
pub mod tone;

pub use adapter::SourceAdapter;
pub use driver::SampleSource;
pub use frame::SampleFrame;
pub use replay::ReplaySource;
pub use tone::ToneSource;

use crate::config::{SourceConfig, SourceKind};
use crate::error::SourceError;

/// Build the driver selected by the configuration
pub fn driver_from_config(config: &SourceConfig) -> Result<Box<dyn SampleSource>, SourceError> {
    match config.kind {
        SourceKind::Tone => Ok(Box::new(ToneSource::realtime())),
        SourceKind::Replay => {
            let path = config.replay_path.as_ref().ok_or_else(|| {
                SourceError::DeviceUnavailable("replay source has no capture file".into())
            })?;
            Ok(Box::new(ReplaySource::new(path)))
        }
    }
}
