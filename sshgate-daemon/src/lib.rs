//! sshgate daemon library: user directory, session store, and the
//! authentication orchestration the binary and the integration tests
//! share.

pub mod directory;
pub mod http;
pub mod service;
pub mod sessions;
