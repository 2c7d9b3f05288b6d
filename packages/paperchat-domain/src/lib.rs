pub mod chat;
pub mod chunking;
pub mod lifecycle;
pub mod quota;
pub mod reconcile;

pub use chat::{ChatEntry, Role};
pub use chunking::{Chunk, split_text};
pub use lifecycle::DocumentStatus;
pub use quota::{Plan, QuotaDenial, QuotaPolicy};
pub use reconcile::{ChatView, PLACEHOLDER_BODY, reconcile};
