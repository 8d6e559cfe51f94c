//! Domain types shared by every crate in the workspace.

mod fragment;
mod session;

pub use fragment::{
    AudioRef, ErrorKind, Fragment, FragmentError, FragmentId, FragmentStatus,
};
pub use session::{Session, SessionId, SessionState};
