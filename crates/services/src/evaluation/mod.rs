mod debounce;
mod session;
mod state;

pub use session::EvaluationSession;
pub use state::{SessionPhase, SessionSnapshot};
