//! The chat pipeline: what happens to one user message.
//!
//! 1. **Receive** the message and any attached files
//! 2. **Extract** attachments and merge them into the session's context store
//! 3. **Assemble** a bounded prompt from the store and the message
//! 4. **Invoke** the model, whole or incremental, under a deadline
//! 5. **Record** the reply (or the fallback message) in the conversation log
//!
//! Steps 2 to 5 run while the caller holds the session exclusively, so one
//! session never has two requests in flight.

pub mod assembler;
pub mod event;
pub mod invoke;
pub mod pipeline;
pub mod question_log;

pub use assembler::{AssembledPrompt, AssemblyStats, ContextAssembler, ContextLimits};
pub use event::TurnEvent;
pub use invoke::{FALLBACK_MESSAGE, FragmentStream, Invocation, InvocationMode, ModelInvoker};
pub use pipeline::{ChatPipeline, FileWarning, TurnOutcome, UPLOAD_ONLY_TEXT, UserInput};
pub use question_log::QuestionLog;
