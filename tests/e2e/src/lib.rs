//! End-to-end test support for dossier search
//!
//! - [`harness`]: isolated stores, engines and routers
//! - [`mocks`]: the bilingual fixture corpus and fake collaborators

pub mod harness {
    pub mod db_manager;

    pub use db_manager::TestSearchEnv;
}

pub mod mocks {
    pub mod fakes;
    pub mod fixtures;

    pub use fakes::{DelayedStore, DownCache, DownEmbedder, DownStore, HangingCache};
    pub use fixtures::{RESTRICTED_LEVEL, SeededCorpus, TestDataFactory};
}

pub use harness::TestSearchEnv;
pub use mocks::{SeededCorpus, TestDataFactory};
