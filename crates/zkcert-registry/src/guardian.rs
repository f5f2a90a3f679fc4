//! # Guardian Whitelist
//!
//! Guardians are the principals allowed to enqueue certificate
//! operations. The whitelist is admin-gated; each guardian registers an
//! Ed25519 public key and metadata, and may delegate enqueue rights to
//! issuer accounts. Accounts are exclusive — an account belongs to at
//! most one guardian.
//!
//! Revoking a guardian does not walk and flip every delegated account.
//! Authorization always re-checks the delegating guardian's flag
//! through the account's back-pointer, so the cascade is O(1) at query
//! time and `revoke_role` is O(1) regardless of delegation fan-out.

use std::collections::{BTreeSet, HashMap};

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use zkcert_core::AccountId;

/// Errors from guardian whitelist operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardianError {
    /// The caller is not the registry admin.
    #[error("caller {0} is not the registry admin")]
    NotAdmin(AccountId),

    /// No guardian is registered under this identifier.
    #[error("unknown guardian {0}")]
    UnknownGuardian(AccountId),

    /// The caller is not a registered guardian.
    #[error("caller {0} is not a guardian")]
    NotGuardian(AccountId),

    /// The account is already an issuer account of a different guardian.
    #[error("account {account} is already claimed by guardian {claimed_by}")]
    IssuerAlreadyClaimed {
        /// The contested account.
        account: AccountId,
        /// The guardian currently holding it.
        claimed_by: AccountId,
    },

    /// The account is itself a guardian and cannot be delegated to.
    #[error("account {0} is a guardian and cannot be an issuer account")]
    AccountIsGuardian(AccountId),

    /// The account is not an issuer account of the calling guardian.
    #[error("account {account} is not an issuer account of guardian {guardian}")]
    NotIssuerOf {
        /// The account named in the removal.
        account: AccountId,
        /// The calling guardian.
        guardian: AccountId,
    },
}

/// Descriptive metadata registered alongside a guardian's public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianMetadata {
    /// Human-readable issuer name.
    pub name: String,
    /// Optional issuer service endpoint.
    pub url: Option<String>,
}

/// One registered guardian: key material, metadata, activity flag, and
/// the set of delegated issuer accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianRecord {
    /// The guardian's Ed25519 public key.
    pub pubkey: VerifyingKey,
    /// Registered metadata.
    pub metadata: GuardianMetadata,
    /// Whether the guardian is currently active. Cleared by
    /// `revoke_role`; checked on every authorization, including for
    /// delegated accounts.
    pub active: bool,
    /// Delegated issuer accounts, each individually removable.
    issuer_accounts: BTreeSet<AccountId>,
}

impl GuardianRecord {
    /// The guardian's delegated issuer accounts.
    pub fn issuer_accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.issuer_accounts.iter()
    }
}

/// The admin-gated whitelist of certificate issuers.
#[derive(Debug, Clone)]
pub struct GuardianRegistry {
    admin: AccountId,
    guardians: HashMap<AccountId, GuardianRecord>,
    /// Back-pointer from issuer account to its delegating guardian.
    issuer_index: HashMap<AccountId, AccountId>,
}

impl GuardianRegistry {
    /// Create a whitelist administered by `admin`.
    pub fn new(admin: AccountId) -> Self {
        Self {
            admin,
            guardians: HashMap::new(),
            issuer_index: HashMap::new(),
        }
    }

    /// The registry admin.
    pub fn admin(&self) -> &AccountId {
        &self.admin
    }

    /// Register (or re-activate) a guardian. Admin only.
    ///
    /// Re-granting an existing guardian refreshes its key and metadata
    /// and restores the active flag; delegated accounts are kept.
    pub fn grant_role(
        &mut self,
        caller: &AccountId,
        guardian: AccountId,
        pubkey: VerifyingKey,
        metadata: GuardianMetadata,
    ) -> Result<(), GuardianError> {
        if caller != &self.admin {
            return Err(GuardianError::NotAdmin(*caller));
        }
        if let Some(claimed_by) = self.issuer_index.get(&guardian) {
            return Err(GuardianError::IssuerAlreadyClaimed {
                account: guardian,
                claimed_by: *claimed_by,
            });
        }
        let entry = self
            .guardians
            .entry(guardian)
            .or_insert_with(|| GuardianRecord {
                pubkey,
                metadata: metadata.clone(),
                active: true,
                issuer_accounts: BTreeSet::new(),
            });
        entry.pubkey = pubkey;
        entry.metadata = metadata;
        entry.active = true;
        info!(%guardian, name = %entry.metadata.name, "guardian role granted");
        Ok(())
    }

    /// Deactivate a guardian. Admin only.
    ///
    /// All of the guardian's issuer accounts lose authorization with it
    /// — `is_authorized` re-checks this flag through the back-pointer.
    pub fn revoke_role(
        &mut self,
        caller: &AccountId,
        guardian: &AccountId,
    ) -> Result<(), GuardianError> {
        if caller != &self.admin {
            return Err(GuardianError::NotAdmin(*caller));
        }
        let record = self
            .guardians
            .get_mut(guardian)
            .ok_or(GuardianError::UnknownGuardian(*guardian))?;
        record.active = false;
        info!(%guardian, accounts = record.issuer_accounts.len(), "guardian role revoked");
        Ok(())
    }

    /// Delegate enqueue rights to an issuer account. Callable only by
    /// the guardian itself. Re-adding an account the guardian already
    /// holds is a no-op.
    pub fn add_issuer_account(
        &mut self,
        caller: &AccountId,
        account: AccountId,
    ) -> Result<(), GuardianError> {
        if !self.guardians.contains_key(caller) {
            return Err(GuardianError::NotGuardian(*caller));
        }
        if self.guardians.contains_key(&account) {
            return Err(GuardianError::AccountIsGuardian(account));
        }
        if let Some(claimed_by) = self.issuer_index.get(&account) {
            if claimed_by != caller {
                return Err(GuardianError::IssuerAlreadyClaimed {
                    account,
                    claimed_by: *claimed_by,
                });
            }
            return Ok(());
        }
        self.issuer_index.insert(account, *caller);
        if let Some(record) = self.guardians.get_mut(caller) {
            record.issuer_accounts.insert(account);
        }
        info!(guardian = %caller, %account, "issuer account added");
        Ok(())
    }

    /// Withdraw a previously delegated issuer account. Callable only by
    /// the delegating guardian.
    pub fn remove_issuer_account(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
    ) -> Result<(), GuardianError> {
        if !self.guardians.contains_key(caller) {
            return Err(GuardianError::NotGuardian(*caller));
        }
        match self.issuer_index.get(account) {
            Some(claimed_by) if claimed_by == caller => {
                self.issuer_index.remove(account);
                if let Some(record) = self.guardians.get_mut(caller) {
                    record.issuer_accounts.remove(account);
                }
                info!(guardian = %caller, %account, "issuer account removed");
                Ok(())
            }
            _ => Err(GuardianError::NotIssuerOf {
                account: *account,
                guardian: *caller,
            }),
        }
    }

    /// Whether `principal` may enqueue operations: an active guardian,
    /// or an issuer account whose delegating guardian is active.
    pub fn is_authorized(&self, principal: &AccountId) -> bool {
        if let Some(record) = self.guardians.get(principal) {
            return record.active;
        }
        if let Some(guardian) = self.issuer_index.get(principal) {
            return self
                .guardians
                .get(guardian)
                .map(|record| record.active)
                .unwrap_or(false);
        }
        false
    }

    /// The guardian record registered under `guardian`, if any.
    pub fn guardian_record(&self, guardian: &AccountId) -> Option<&GuardianRecord> {
        self.guardians.get(guardian)
    }

    /// The guardian an issuer account is delegated from, if any.
    pub fn guardian_of(&self, account: &AccountId) -> Option<&AccountId> {
        self.issuer_index.get(account)
    }
}
