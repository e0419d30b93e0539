use std::fmt;
use std::ptr::NonNull;

use thiserror::Error;

/// Largest template any extraction entry point may write into a caller-supplied buffer.
/// The vendor does not report a bound up front, so scratch buffers are always this size.
pub const MAX_TEMPLATE_SIZE: usize = 400_000;

/// Scan resolution passed to every extraction call that takes one.
pub const RESOLUTION_PPI: i32 = 500;
pub const ELFT_LATENT_QUALITY: i32 = 32;
pub const ELFT_TENPRINT_QUALITY: i32 = 8;
pub const ELFT_M_QUALITY: i32 = 5;
/// Last argument of the fixed-format verify calls.
pub const VERIFY_LEVEL: i32 = 1;

/// Nonzero return code of a vendor call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("vendor error code {0}")]
pub struct SdkError(pub i32);

impl SdkError {
    /// Map a raw vendor return code, zero meaning success.
    pub fn check(code: i32) -> Result<(), SdkError> {
        if code == 0 {
            Ok(())
        } else {
            Err(SdkError(code))
        }
    }
}

/// Borrowed 8-bit single-channel image, row-major.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    pub data: &'a [u8],
    pub rows: i32,
    pub columns: i32,
}

impl<'a> ImageView<'a> {
    pub fn new(data: &'a [u8], rows: i32, columns: i32) -> Self {
        Self {
            data,
            rows,
            columns,
        }
    }
}

/// Template memory allocated by the vendor.
///
/// Dropping a `VendorBuffer` does not release it: ownership has to go back through
/// [`LatentSdk::elft_m_free_template`], exactly once.
pub struct VendorBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

impl VendorBuffer {
    /// # Safety
    ///
    /// `ptr` must point to `len` initialized bytes that stay valid until the buffer
    /// is handed to the allocating SDK's free call.
    pub unsafe fn from_raw(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // Valid per the contract of `from_raw`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl fmt::Debug for VendorBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// The LatentEFS entry points, one method per vendor function.
///
/// Implementations are not assumed to be reentrant; callers serialize access.
/// Verify calls take the probe template first and the gallery second.
pub trait LatentSdk: Send + Sync {
    /// `NEC_LFML_ExtractLatent`. Returns the number of bytes written to `template`.
    fn lfml_extract_latent(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError>;

    /// `NEC_LFML_ExtractTenprint`.
    fn lfml_extract_tenprint(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError>;

    /// `NEC_ELFT_ExtractLatent`.
    fn elft_extract_latent(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        quality: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError>;

    /// `NEC_ELFT_ExtractTenprint`.
    fn elft_extract_tenprint(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        quality: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError>;

    /// `NEC_ELFT_M_ExtractLatent`. The vendor signature only takes the column count.
    /// `template` may be set even when an error is returned.
    fn elft_m_extract_latent(
        &self,
        image: ImageView<'_>,
        quality: i32,
        template: &mut Option<VendorBuffer>,
    ) -> Result<(), SdkError>;

    /// `NEC_ELFT_M_ExtractTenprint`.
    fn elft_m_extract_tenprint(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        quality: i32,
        template: &mut Option<VendorBuffer>,
    ) -> Result<(), SdkError>;

    /// `NEC_LFML_Verify`. Template sizes are passed explicitly.
    fn lfml_verify(&self, probe: &[u8], gallery: &[u8], score: &mut i32) -> Result<(), SdkError>;

    /// `NEC_ELFT_Verify`. Fixed-format templates, sizes are not passed.
    fn elft_verify(
        &self,
        probe: &[u8],
        gallery: &[u8],
        score: &mut i32,
        level: i32,
    ) -> Result<(), SdkError>;

    /// `NEC_ELFT_M_Verify`.
    fn elft_m_verify(
        &self,
        probe: &[u8],
        gallery: &[u8],
        score: &mut i32,
        level: i32,
    ) -> Result<(), SdkError>;

    /// `NEC_ELFT_M_FreeTemplate`.
    fn elft_m_free_template(&self, template: VendorBuffer);
}
