pub mod sdk;

#[cfg(feature = "nec-sdk")]
pub mod ffi;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

// Re-export commonly used types
pub use sdk::{
    ImageView, LatentSdk, SdkError, VendorBuffer, ELFT_LATENT_QUALITY, ELFT_M_QUALITY,
    ELFT_TENPRINT_QUALITY, MAX_TEMPLATE_SIZE, RESOLUTION_PPI, VERIFY_LEVEL,
};

#[cfg(feature = "nec-sdk")]
pub use ffi::NecLatentSdk;
