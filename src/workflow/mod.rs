pub mod session;

pub use session::{DocumentWorkspace, Session, SessionContainer};
