pub mod assistant_client;

pub use assistant_client::{AssistantApi, AssistantClient};
