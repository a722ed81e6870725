//! Cloud registration.
//!
//! A [`Registrar`] adopts one device into the organization it was built for.
//! [`MistRegistrar`] talks to the Juniper Mist REST API.

mod mist;

use std::future::Future;

pub use mist::MistRegistrar;

use crate::error::RegistrationError;

/// Cloud confirmation that a device was adopted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adoption {
    /// Id assigned by the cloud, or the identifier when none is returned.
    pub device_id: String,
}

/// Adopts devices into a cloud organization.
///
/// One call is one HTTP request; retries belong to the caller.
pub trait Registrar: Send + Sync {
    /// Adopt the device known by `identifier` (its serial number).
    fn adopt(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Adoption, RegistrationError>> + Send;
}
