//! Search Hacker News, dismiss results locally, and remember the last search.
//!
//! The moving parts, leaves first:
//!
//! - [`term::PersistentTerm`] mirrors the search input into a [`db::KeyValueStore`].
//! - [`controller::FetchController`] turns a committed term into a request and
//!   reports its outcome to the store.
//! - [`store::StoriesStore`] applies lifecycle and removal actions through the
//!   pure [`store::reduce`] function.
//!
//! [`session::SearchSession`] wires them together behind the three entry points a
//! front end needs: input, submit and remove.

pub mod config;
pub mod controller;
pub mod db;
pub mod hn_client;
pub mod models;
pub mod render;
pub mod session;
pub mod store;
pub mod term;

pub use hn_client::{FetchError, HackerNewsClient, StorySource};
pub use models::{StoriesState, Story, StoryId};
pub use session::{SearchMode, SearchSession, SessionOptions, SessionSnapshot};
pub use store::{StoreError, StoriesAction, StoriesStore};
