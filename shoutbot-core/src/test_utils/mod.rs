// File: shoutbot-core/src/test_utils/mod.rs
//
// Shared by unit tests and the integration tests under `tests/`.

pub mod fakes;
pub mod helpers;
pub mod memory;

pub use fakes::{
    FakeChatConnector, NoPronouns, RecordingChat, RecordingHandler, RecordingTwitchApi, SentAnnouncement,
    SentShoutout,
};
pub use helpers::setup_test_database;
pub use memory::InMemoryStore;
