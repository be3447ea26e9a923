//! Use case implementations.

mod load_avatars_use_case;

pub use load_avatars_use_case::{DEFAULT_MAX_CONCURRENT_FETCHES, LoadAvatarsUseCase};
