//! Bindings to the NEC Latent SDK (`LatentEFS`).
//!
//! Applications linking this must run with their working directory set to the SDK's
//! `bin/win/32` folder, which is where the vendor library looks for its data files.

use std::ptr::{self, NonNull};

use libc::{c_int, c_uchar};

use crate::sdk::{ImageView, LatentSdk, SdkError, VendorBuffer, MAX_TEMPLATE_SIZE};

#[link(name = "LatentEFS")]
extern "C" {
    fn NEC_LFML_ExtractLatent(
        image: *const c_uchar,
        rows: c_int,
        columns: c_int,
        ppi: c_int,
        template: *mut c_uchar,
        size: *mut c_int,
    ) -> c_int;
    fn NEC_LFML_ExtractTenprint(
        image: *const c_uchar,
        rows: c_int,
        columns: c_int,
        ppi: c_int,
        template: *mut c_uchar,
        size: *mut c_int,
    ) -> c_int;
    fn NEC_ELFT_ExtractLatent(
        image: *const c_uchar,
        rows: c_int,
        columns: c_int,
        ppi: c_int,
        quality: c_int,
        template: *mut c_uchar,
        size: *mut c_int,
    ) -> c_int;
    fn NEC_ELFT_ExtractTenprint(
        image: *const c_uchar,
        rows: c_int,
        columns: c_int,
        ppi: c_int,
        quality: c_int,
        template: *mut c_uchar,
        size: *mut c_int,
    ) -> c_int;
    fn NEC_ELFT_M_ExtractLatent(
        image: *const c_uchar,
        columns: c_int,
        quality: c_int,
        template: *mut *mut c_uchar,
        size: *mut c_int,
    ) -> c_int;
    fn NEC_ELFT_M_ExtractTenprint(
        image: *const c_uchar,
        rows: c_int,
        columns: c_int,
        ppi: c_int,
        quality: c_int,
        template: *mut *mut c_uchar,
        size: *mut c_int,
    ) -> c_int;
    fn NEC_LFML_Verify(
        probe: *const c_uchar,
        probe_size: c_int,
        gallery: *const c_uchar,
        gallery_size: c_int,
        score: *mut c_int,
    ) -> c_int;
    fn NEC_ELFT_Verify(
        probe: *const c_uchar,
        gallery: *const c_uchar,
        score: *mut c_int,
        level: c_int,
    ) -> c_int;
    fn NEC_ELFT_M_Verify(
        probe: *const c_uchar,
        gallery: *const c_uchar,
        score: *mut c_int,
        level: c_int,
    ) -> c_int;
    fn NEC_ELFT_M_FreeTemplate(template: *mut *mut c_uchar);
}

/// Handle to the linked vendor library. The library keeps process-global state,
/// so every handle talks to the same instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct NecLatentSdk;

impl NecLatentSdk {
    pub fn new() -> Self {
        Self
    }
}

fn check_pixels(image: &ImageView<'_>) {
    assert_eq!(
        image.data.len(),
        image.rows.max(0) as usize * image.columns.max(0) as usize,
        "image buffer does not match its dimensions"
    );
}

fn fixed(
    template: &mut [u8],
    call: impl FnOnce(*mut c_uchar, *mut c_int) -> c_int,
) -> Result<usize, SdkError> {
    // The vendor writes without a bound, the buffer must cover the documented maximum.
    assert!(
        template.len() >= MAX_TEMPLATE_SIZE,
        "scratch buffer smaller than MAX_TEMPLATE_SIZE"
    );
    let mut size: c_int = 0;
    SdkError::check(call(template.as_mut_ptr(), &mut size))?;
    Ok(size.max(0) as usize)
}

fn allocated(
    template: &mut Option<VendorBuffer>,
    call: impl FnOnce(*mut *mut c_uchar, *mut c_int) -> c_int,
) -> Result<(), SdkError> {
    let mut raw: *mut c_uchar = ptr::null_mut();
    let mut size: c_int = 0;
    let code = call(&mut raw, &mut size);
    if let Some(ptr) = NonNull::new(raw) {
        // SAFETY: the vendor hands back `size` bytes it owns until NEC_ELFT_M_FreeTemplate.
        *template = Some(unsafe { VendorBuffer::from_raw(ptr, size.max(0) as usize) });
    }
    SdkError::check(code)
}

impl LatentSdk for NecLatentSdk {
    fn lfml_extract_latent(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError> {
        check_pixels(&image);
        fixed(template, |out, size| unsafe {
            NEC_LFML_ExtractLatent(image.data.as_ptr(), image.rows, image.columns, ppi, out, size)
        })
    }

    fn lfml_extract_tenprint(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError> {
        check_pixels(&image);
        fixed(template, |out, size| unsafe {
            NEC_LFML_ExtractTenprint(image.data.as_ptr(), image.rows, image.columns, ppi, out, size)
        })
    }

    fn elft_extract_latent(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        quality: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError> {
        check_pixels(&image);
        fixed(template, |out, size| unsafe {
            NEC_ELFT_ExtractLatent(
                image.data.as_ptr(),
                image.rows,
                image.columns,
                ppi,
                quality,
                out,
                size,
            )
        })
    }

    fn elft_extract_tenprint(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        quality: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError> {
        check_pixels(&image);
        fixed(template, |out, size| unsafe {
            NEC_ELFT_ExtractTenprint(
                image.data.as_ptr(),
                image.rows,
                image.columns,
                ppi,
                quality,
                out,
                size,
            )
        })
    }

    fn elft_m_extract_latent(
        &self,
        image: ImageView<'_>,
        quality: i32,
        template: &mut Option<VendorBuffer>,
    ) -> Result<(), SdkError> {
        check_pixels(&image);
        allocated(template, |out, size| unsafe {
            NEC_ELFT_M_ExtractLatent(image.data.as_ptr(), image.columns, quality, out, size)
        })
    }

    fn elft_m_extract_tenprint(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        quality: i32,
        template: &mut Option<VendorBuffer>,
    ) -> Result<(), SdkError> {
        check_pixels(&image);
        allocated(template, |out, size| unsafe {
            NEC_ELFT_M_ExtractTenprint(
                image.data.as_ptr(),
                image.rows,
                image.columns,
                ppi,
                quality,
                out,
                size,
            )
        })
    }

    fn lfml_verify(&self, probe: &[u8], gallery: &[u8], score: &mut i32) -> Result<(), SdkError> {
        let code = unsafe {
            NEC_LFML_Verify(
                probe.as_ptr(),
                probe.len() as c_int,
                gallery.as_ptr(),
                gallery.len() as c_int,
                score,
            )
        };
        SdkError::check(code)
    }

    fn elft_verify(
        &self,
        probe: &[u8],
        gallery: &[u8],
        score: &mut i32,
        level: i32,
    ) -> Result<(), SdkError> {
        let code = unsafe { NEC_ELFT_Verify(probe.as_ptr(), gallery.as_ptr(), score, level) };
        SdkError::check(code)
    }

    fn elft_m_verify(
        &self,
        probe: &[u8],
        gallery: &[u8],
        score: &mut i32,
        level: i32,
    ) -> Result<(), SdkError> {
        let code = unsafe { NEC_ELFT_M_Verify(probe.as_ptr(), gallery.as_ptr(), score, level) };
        SdkError::check(code)
    }

    fn elft_m_free_template(&self, template: VendorBuffer) {
        let mut raw = template.as_ptr();
        log::trace!("freeing vendor template of {} bytes", template.len());
        unsafe { NEC_ELFT_M_FreeTemplate(&mut raw) };
    }
}
