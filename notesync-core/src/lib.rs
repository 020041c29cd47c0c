//! notesync-core — the team layer over a replicated note store.
//!
//! Several people edit a shared set of text documents through a revisioned
//! document store. This crate supplies everything needed to stay oriented in
//! that shared space:
//!
//! - [`anchor`] — capture a fingerprint of a text selection and relocate it
//!   after arbitrary concurrent edits.
//! - [`diff`] — token-level diff between two revisions, with a summary and
//!   an escaped markup rendering.
//! - [`tracker`] — in-memory unread set and bounded activity feed driven by
//!   the replication stream.
//! - [`readstate`] — the durable per-file "last seen revision" ledger.
//! - [`annotations`] — threaded, anchored comments with the relocation
//!   refresh cycle.
//!
//! Around the core: [`store`] defines the document-store contract and
//! [`db`] the SQLite replica adapter; [`config`], [`settings`], [`notify`],
//! [`directory`], and [`policy`] cover team management, settings push,
//! notification fan-out, and the store's write-policy contract.
//!
//! Pure modules never fail; storage-facing modules return
//! [`error::StoreError`] and translate the store's not-found condition into
//! `Option`/boolean results rather than errors.

pub mod anchor;
pub mod annotations;
pub mod config;
pub mod db;
pub mod diff;
pub mod directory;
pub mod error;
pub mod notify;
pub mod policy;
pub mod readstate;
pub mod schema;
pub mod settings;
pub mod store;
pub mod tracker;
pub mod types;

pub use error::StoreError;
pub use types::{
    ActivityEntry, AnchorContext, AnchorRange, Annotation, FileReadState, RenderAnnotation,
    TeamConfig, TeamRole,
};
