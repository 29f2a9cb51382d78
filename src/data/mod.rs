//! Signal chain: moving average, step correction and signal extraction.
pub mod corrector;
pub mod extractor;
pub mod running_average;

pub use corrector::{CorrectedSample, CorrectorParams, DiscontinuityCorrector, Sample, StepAssessment};
pub use extractor::{ExtractorConfig, ExtractorOutput, SignalExtractor};
pub use running_average::RunningAverage;
