//! Message board service layer.
//!
//! Stores `Message` records in a `msgboard_store::StoreEngine`, keyed by a
//! server-assigned UUID, and exposes create/get/update/delete/list plus a
//! case-insensitive substring search.
//!
//! ```no_run
//! use msgboard_service::{MessagePatch, MessageService, NewMessage};
//! use msgboard_store::Config;
//!
//! let board = MessageService::open("./board-data", Config::durable())?;
//! let msg = board.create(NewMessage::new("Board update", "Meeting at noon"))?;
//! board.update(&msg.id, MessagePatch::body("Meeting at 1pm"))?;
//! assert_eq!(board.search("1PM")?.len(), 1);
//! board.close()?;
//! # Ok::<(), msgboard_service::BoardError>(())
//! ```

pub mod clock;
pub mod error;
pub mod message;
pub mod record_store;
pub mod search;
pub mod service;

pub use clock::{Clock, SystemClock};
pub use error::{BoardError, BoardResult};
pub use message::{Message, MessagePatch, NewMessage};
pub use record_store::RecordStore;
pub use search::SearchView;
pub use service::MessageService;
