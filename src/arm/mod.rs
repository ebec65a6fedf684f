//! Resource access: ARM REST client, offline store, read-modify-write helper

mod client;
mod error;
mod store;

pub use client::ArmClient;
pub use error::ArmError;
pub use store::{update_resource, LocalStore, ResourceStore};

use crate::error::CdnError;

/// Rewrite a missing-resource failure into the user-facing form naming `kind`.
pub fn not_found_as(err: anyhow::Error, kind: &'static str) -> anyhow::Error {
    match err.downcast_ref::<ArmError>() {
        Some(ArmError::NotFound(id)) => CdnError::NotFound {
            kind,
            id: id.clone(),
        }
        .into(),
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_translated() {
        let err = not_found_as(ArmError::NotFound("/x/y".into()).into(), "Endpoint");
        assert_eq!(
            err.to_string(),
            "Endpoint not found. Please verify the resource(s) exist: /x/y"
        );
    }

    #[test]
    fn other_errors_pass_through() {
        let err = not_found_as(ArmError::Timeout(3).into(), "Endpoint");
        assert!(err.downcast_ref::<ArmError>().is_some());
    }
}
