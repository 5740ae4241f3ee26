pub mod document;
pub mod error_detail;
pub mod question;

pub use document::{is_supported_document, DocumentInfo, UploadFile, UploadResponse, SUPPORTED_EXTENSIONS};
pub use error_detail::{extract_error_message, GENERIC_ERROR_MESSAGE};
pub use question::{
    AnswerStatus, AskAnswer, AskResponse, ChallengeQuestion, EvaluationResponse, Feedback,
    QuestionId,
};
