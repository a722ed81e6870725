//! Configuration session trait.
//!
//! Config sessions are treated as transactions, not privilege levels.
//! A session guard holds `&mut D` for some `Driver`, so nothing else can use the
//! driver while it is alive, and `commit()`/`abort()` consume it.

use std::future::Future;

use crate::error::Result;

/// Core configuration session trait.
pub trait ConfigSession: Send {
    /// Commit the configuration and exit the session.
    fn commit(self) -> impl Future<Output = Result<()>> + Send;

    /// Discard uncommitted changes and exit the session.
    fn abort(self) -> impl Future<Output = Result<()>> + Send;
}
