//! Release resources at the end of a scope without letting a failed release hide the error
//! that actually matters: the first error recorded always wins.

pub mod future_helper;
pub mod guard;
pub mod merge;
pub mod release;

pub use future_helper::{
    check_and_merge_async, release_and_merge_async, with_release_async, AsyncRelease,
};
pub use guard::{with_release, ReleaseGuard};
pub use merge::{check_and_merge, release_and_merge};
pub use release::Release;
