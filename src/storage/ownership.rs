// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for namespace access.
//!
//! A request may only touch the namespace of the identity carried by its
//! token. Routes that name an owner in the URL check it through here.

use crate::auth::AuthenticatedUser;

use super::{StorageError, StorageResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owning identity.
    fn owner_identity(&self) -> &str;
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that the user owns this resource.
    ///
    /// # Errors
    /// Returns `StorageError::Forbidden` if the user doesn't own the resource.
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        if self.owner_identity() == user.identity {
            Ok(())
        } else {
            Err(StorageError::Forbidden {
                identity: user.identity.clone(),
                owner: self.owner_identity().to_string(),
            })
        }
    }
}

/// A namespace addressed by owner identity, e.g. from a URL segment.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceOwner<'a>(pub &'a str);

impl OwnedResource for NamespaceOwner<'_> {
    fn owner_identity(&self) -> &str {
        self.0
    }
}
