pub mod ai;
pub mod audio;
pub mod calendar;
pub mod conversation;
pub mod scheduling;
pub mod session;
pub mod synthesis;
pub mod transcode;
pub mod transcription;
