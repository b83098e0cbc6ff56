//! # Events Module
//!
//! Progress reporting over channels.
//!
//! The library emits events; any front end (the CLI here) subscribes and
//! renders them. Nothing in the library blocks on a missing listener.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Hash(HashEvent::Progress(p)) = event {
//!             println!("Hashed {}/{}", p.completed, p.total);
//!         }
//!     }
//! });
//!
//! let batch = pipeline.hash_batch_with_events(inputs, SourceTag::Local, &sender);
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
