pub mod analysis;
pub mod bands;
pub mod buffer;
pub mod decode;
pub mod resample;
pub mod stft;

pub use analysis::{analyze, AnalysisParams, BandTimeline};
pub use bands::{BandEnergies, BandExtractor, FrequencyBand};
pub use buffer::{AudioBuffer, Channel};
