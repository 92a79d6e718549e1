//! Selection state and preview cache for a contact sheet selector node
//! embedded in a host execution graph.
//!
//! The node shows the incoming batch as a grid of previews; the user's picks
//! arrive asynchronously over HTTP and take effect on the *next* run.

pub mod error;
pub mod frame;
pub mod node;
pub mod preview;
pub mod selection;
pub mod server;

pub use error::NodeError;
pub use frame::{Frame, FrameBatch};
pub use node::{ContactSheetSelector, ContactSheetUi, ExecutingContext, NodeOutput};
pub use preview::PreviewCache;
pub use selection::SelectionStore;
pub use server::selection_router;
