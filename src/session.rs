use std::sync::{Arc, Mutex, MutexGuard};

use neclatent_sdk::LatentSdk;

/// Guards every call into the vendor library, across all sessions in the process.
static VENDOR_LOCK: Mutex<()> = Mutex::new(());

/// Shared handle to a vendor SDK that serializes calls into it.
///
/// The vendor library is not reentrant and keeps process-global state. Every
/// enrollment runs under one process-wide lock, whichever session or registry it
/// comes from; comparisons do too unless `serialize_comparisons` is turned off.
pub struct SdkSession {
    sdk: Arc<dyn LatentSdk>,
    serialize_comparisons: bool,
}

impl SdkSession {
    pub fn new(sdk: Arc<dyn LatentSdk>) -> Self {
        Self {
            sdk,
            serialize_comparisons: true,
        }
    }

    pub fn with_serialized_comparisons(mut self, serialize: bool) -> Self {
        self.serialize_comparisons = serialize;
        self
    }

    pub fn serializes_comparisons(&self) -> bool {
        self.serialize_comparisons
    }

    /// Run an extraction with exclusive access to the SDK.
    pub fn enroll<T>(&self, call: impl FnOnce(&dyn LatentSdk) -> T) -> T {
        let _guard = self.acquire();
        call(self.sdk.as_ref())
    }

    /// Run a verification, exclusive if comparisons are serialized.
    pub fn compare<T>(&self, call: impl FnOnce(&dyn LatentSdk) -> T) -> T {
        let _guard = self.serialize_comparisons.then(|| self.acquire());
        call(self.sdk.as_ref())
    }

    fn acquire(&self) -> MutexGuard<'static, ()> {
        // A panic inside the vendor call leaves nothing to repair behind a unit lock.
        VENDOR_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for SdkSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkSession")
            .field("serialize_comparisons", &self.serialize_comparisons)
            .finish_non_exhaustive()
    }
}
