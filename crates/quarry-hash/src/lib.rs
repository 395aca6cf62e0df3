//! Object identity for the quarry object store.
//!
//! Every git object is addressed by the SHA-1 hash of its serialized form
//! (`"<type> <size>\0<content>"`). This crate provides the [`ObjectId`]
//! type, the hex encoding it is displayed with, and a collision-checked
//! hasher for computing ids.

mod error;
pub mod hasher;
pub mod hex;
mod oid;

pub use error::HashError;
pub use oid::ObjectId;
