use crate::config::{AppConfig, BusinessProfile};
use crate::services::ai::LlmProvider;
use crate::services::calendar::CalendarProvider;
use crate::services::synthesis::SynthesisProvider;
use crate::services::transcode::Transcoder;
use crate::services::transcription::TranscriptionProvider;

pub struct AppState {
    pub config: AppConfig,
    pub business: BusinessProfile,
    pub llm: Box<dyn LlmProvider>,
    pub transcriber: Box<dyn TranscriptionProvider>,
    pub synthesizer: Box<dyn SynthesisProvider>,
    pub transcoder: Box<dyn Transcoder>,
    pub calendar: Box<dyn CalendarProvider>,
}
