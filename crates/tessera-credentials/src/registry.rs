use dashmap::DashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use crate::error::CredentialError;
use crate::store::CredentialStore;
use crate::wallet::Wallet;

/// Process-wide table of open wallets addressed by integer handle.
pub struct WalletRegistry {
    wallets: DashMap<i32, Arc<Wallet>>,
    next_handle: AtomicI32,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self {
            wallets: DashMap::new(),
            next_handle: AtomicI32::new(1),
        }
    }

    /// Open a fresh wallet and return its handle.
    pub fn open(&self, owner: &str) -> i32 {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.wallets.insert(handle, Arc::new(Wallet::new(owner)));
        tracing::debug!(handle, owner, "wallet opened");
        handle
    }

    /// Resolve a handle; unknown or closed handles are `InvalidHandle`.
    pub fn get(&self, handle: i32) -> Result<Arc<Wallet>, CredentialError> {
        let wallet = self
            .wallets
            .get(&handle)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CredentialError::InvalidHandle(format!("wallet handle {}", handle)))?;
        if !wallet.is_open() {
            return Err(CredentialError::InvalidHandle(format!(
                "wallet handle {} is closed",
                handle
            )));
        }
        Ok(wallet)
    }

    /// Close the wallet and drop the handle. Callers still holding the wallet
    /// see `InvalidHandle` from then on.
    pub fn close(&self, handle: i32) -> Result<(), CredentialError> {
        let (_, wallet) = self
            .wallets
            .remove(&handle)
            .ok_or_else(|| CredentialError::InvalidHandle(format!("wallet handle {}", handle)))?;
        wallet.close();
        tracing::debug!(handle, "wallet handle closed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

impl Default for WalletRegistry {
    fn default() -> Self {
        Self::new()
    }
}
