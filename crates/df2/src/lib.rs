//! DF2: a binary, streaming, tree-structured interchange format.
//!
//! A writer emits a hierarchy of named groups and typed values as framed
//! commands; a reader rebuilds the hierarchy by replaying them. Both ends
//! keep a "current group" cursor in lockstep so paths travel relative to
//! it, and frequently addressed nodes can be bound to small integer
//! handles to skip paths altogether.
//!
//! # Example
//!
//! ```
//! use df2::{Df2Stream, Value};
//!
//! let mut bytes = Vec::new();
//! let mut writer = Df2Stream::writer(&mut bytes)?;
//! let mut table = writer.get_or_add_group("Tables")?.get_or_add_group("Table0")?;
//! let length = table.add_or_update("Length", 3u32)?;
//! table.set_handle(Some(1))?;
//! writer.update_value(length, 4u32)?;
//! writer.flush()?;
//!
//! let mut reader = Df2Stream::reader(&bytes[..])?;
//! reader.process_until_end()?;
//! let table = reader.handle(1).expect("bound while writing");
//! assert_eq!(table.at("Length")?.value(), Some(&Value::UInt(4)));
//! # Ok::<(), df2::Df2Error>(())
//! ```
//!
//! Layers, leaves first: `df2_buffers` (varints, floats, strings),
//! `df2_path` (path algebra), then [`kind`], [`Value`], [`command`],
//! [`preface`], the [`Tree`], [`CommandSender`], [`CommandReceiver`] and
//! the [`Df2Stream`] façade.

mod codec;
mod error;
mod receiver;
mod sender;
mod stream;
mod tree;
mod value;
mod view;

pub mod cli;
pub mod command;
pub mod kind;
pub mod preface;

pub use codec::MAX_LIST_DEPTH;
pub use command::{CommandEvent, CommandRecord, Direction, Opcode};
pub use error::{Df2Error, FormatError, Result};
pub use kind::Kind;
pub use preface::PREFACE;
pub use receiver::{CommandReceiver, ReceiverState};
pub use sender::CommandSender;
pub use stream::{Df2Stream, GroupMut, StreamMode, Truncate};
pub use tree::{Node, NodeBody, NodeId, NodeRef, Tree, Upsert};
pub use value::{Array, Value};
pub use view::value_to_json;
