pub mod ask_service;
pub mod challenge_service;
pub mod upload_service;

pub use ask_service::{AskState, QuestionAnswerer};
pub use challenge_service::{ChallengeItemView, ChallengeRunner, ChallengeSnapshot, GenerationPhase};
pub use upload_service::{UploadCoordinator, UploadState};
