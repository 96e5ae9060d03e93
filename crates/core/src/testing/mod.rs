//! Mocks and fixtures for integration testing.

mod fixtures;
mod mock_cloner;

pub use fixtures::{
    write_dialogue_json, write_script_json, write_test_wav, write_test_wav_spec,
};
pub use mock_cloner::MockCloner;
