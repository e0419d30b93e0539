//! In-process stand-in for the vendor library.
//!
//! Records every call with its arguments and entry/exit instants, and tracks the
//! templates it hands out on the ELFT_M path so tests can check they come back.

use std::collections::HashSet;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::sdk::{ImageView, LatentSdk, SdkError, VendorBuffer};

/// One vendor entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entry {
    LfmlExtractLatent,
    LfmlExtractTenprint,
    ElftExtractLatent,
    ElftExtractTenprint,
    ElftMExtractLatent,
    ElftMExtractTenprint,
    LfmlVerify,
    ElftVerify,
    ElftMVerify,
    ElftMFreeTemplate,
}

impl Entry {
    pub fn is_extraction(self) -> bool {
        !matches!(
            self,
            Entry::LfmlVerify | Entry::ElftVerify | Entry::ElftMVerify | Entry::ElftMFreeTemplate
        )
    }
}

/// A recorded call. `args` holds the integer arguments in vendor order
/// (dimensions, resolution, quality for extraction; template lengths and level for verify).
#[derive(Debug, Clone)]
pub struct Call {
    pub entry: Entry,
    pub args: Vec<i32>,
    pub entered: Instant,
    pub exited: Instant,
}

#[derive(Debug)]
pub struct FakeSdk {
    template: Vec<u8>,
    reported_size: Option<usize>,
    extract_error: Option<i32>,
    allocate_on_error: bool,
    score: i32,
    verify_error: Option<i32>,
    delay: Duration,
    calls: Mutex<Vec<Call>>,
    outstanding: Mutex<HashSet<usize>>,
    allocations: AtomicUsize,
}

impl Default for FakeSdk {
    fn default() -> Self {
        Self {
            template: vec![0xA5; 16],
            reported_size: None,
            extract_error: None,
            allocate_on_error: false,
            score: 0,
            verify_error: None,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            outstanding: Mutex::new(HashSet::new()),
            allocations: AtomicUsize::new(0),
        }
    }
}

impl FakeSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes produced by every successful extraction.
    pub fn with_template(mut self, template: Vec<u8>) -> Self {
        self.template = template;
        self
    }

    /// Size reported by fixed-buffer extractions instead of the template length.
    pub fn reporting_size(mut self, size: usize) -> Self {
        self.reported_size = Some(size);
        self
    }

    pub fn failing_extraction(mut self, code: i32) -> Self {
        self.extract_error = Some(code);
        self
    }

    /// On the ELFT_M path, hand out a buffer even when the extraction fails.
    pub fn allocating_on_error(mut self) -> Self {
        self.allocate_on_error = true;
        self
    }

    pub fn with_score(mut self, score: i32) -> Self {
        self.score = score;
        self
    }

    pub fn failing_verify(mut self, code: i32) -> Self {
        self.verify_error = Some(code);
        self
    }

    /// Time spent inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, entry: Entry) -> usize {
        self.calls().iter().filter(|c| c.entry == entry).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls().len()
    }

    /// Buffers handed out on the ELFT_M path.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    /// Buffers handed out and not yet freed.
    pub fn outstanding(&self) -> usize {
        self.outstanding
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn record<T>(&self, entry: Entry, args: Vec<i32>, body: impl FnOnce() -> T) -> T {
        let entered = Instant::now();
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let result = body();
        let exited = Instant::now();
        log::trace!("fake {:?}{:?}", entry, args);
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Call {
                entry,
                args,
                entered,
                exited,
            });
        result
    }

    fn write_fixed(&self, template: &mut [u8]) -> Result<usize, SdkError> {
        if let Some(code) = self.extract_error {
            return Err(SdkError(code));
        }
        let n = self.template.len().min(template.len());
        template[..n].copy_from_slice(&self.template[..n]);
        Ok(self.reported_size.unwrap_or(n))
    }

    fn allocate(&self, template: &mut Option<VendorBuffer>) -> Result<(), SdkError> {
        if self.extract_error.is_none() || self.allocate_on_error {
            let raw = Box::into_raw(self.template.clone().into_boxed_slice()) as *mut u8;
            let ptr = NonNull::new(raw).unwrap_or_else(NonNull::dangling);
            self.outstanding
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(ptr.as_ptr() as usize);
            self.allocations.fetch_add(1, Ordering::SeqCst);
            // SAFETY: freshly leaked boxed slice of exactly this length.
            *template = Some(unsafe { VendorBuffer::from_raw(ptr, self.template.len()) });
        }
        match self.extract_error {
            Some(code) => Err(SdkError(code)),
            None => Ok(()),
        }
    }

    fn verify(&self, score: &mut i32) -> Result<(), SdkError> {
        *score = self.score;
        match self.verify_error {
            Some(code) => Err(SdkError(code)),
            None => Ok(()),
        }
    }
}

fn dims(image: &ImageView<'_>) -> Vec<i32> {
    vec![image.rows, image.columns]
}

impl LatentSdk for FakeSdk {
    fn lfml_extract_latent(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError> {
        let args = [dims(&image), vec![ppi]].concat();
        self.record(Entry::LfmlExtractLatent, args, || self.write_fixed(template))
    }

    fn lfml_extract_tenprint(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError> {
        let args = [dims(&image), vec![ppi]].concat();
        self.record(Entry::LfmlExtractTenprint, args, || self.write_fixed(template))
    }

    fn elft_extract_latent(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        quality: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError> {
        let args = [dims(&image), vec![ppi, quality]].concat();
        self.record(Entry::ElftExtractLatent, args, || self.write_fixed(template))
    }

    fn elft_extract_tenprint(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        quality: i32,
        template: &mut [u8],
    ) -> Result<usize, SdkError> {
        let args = [dims(&image), vec![ppi, quality]].concat();
        self.record(Entry::ElftExtractTenprint, args, || self.write_fixed(template))
    }

    fn elft_m_extract_latent(
        &self,
        image: ImageView<'_>,
        quality: i32,
        template: &mut Option<VendorBuffer>,
    ) -> Result<(), SdkError> {
        let args = vec![image.columns, quality];
        self.record(Entry::ElftMExtractLatent, args, || self.allocate(template))
    }

    fn elft_m_extract_tenprint(
        &self,
        image: ImageView<'_>,
        ppi: i32,
        quality: i32,
        template: &mut Option<VendorBuffer>,
    ) -> Result<(), SdkError> {
        let args = [dims(&image), vec![ppi, quality]].concat();
        self.record(Entry::ElftMExtractTenprint, args, || self.allocate(template))
    }

    fn lfml_verify(&self, probe: &[u8], gallery: &[u8], score: &mut i32) -> Result<(), SdkError> {
        let args = vec![probe.len() as i32, gallery.len() as i32];
        self.record(Entry::LfmlVerify, args, || self.verify(score))
    }

    fn elft_verify(
        &self,
        probe: &[u8],
        gallery: &[u8],
        score: &mut i32,
        level: i32,
    ) -> Result<(), SdkError> {
        let args = vec![probe.len() as i32, gallery.len() as i32, level];
        self.record(Entry::ElftVerify, args, || self.verify(score))
    }

    fn elft_m_verify(
        &self,
        probe: &[u8],
        gallery: &[u8],
        score: &mut i32,
        level: i32,
    ) -> Result<(), SdkError> {
        let args = vec![probe.len() as i32, gallery.len() as i32, level];
        self.record(Entry::ElftMVerify, args, || self.verify(score))
    }

    fn elft_m_free_template(&self, template: VendorBuffer) {
        let len = template.len();
        self.record(Entry::ElftMFreeTemplate, vec![len as i32], || {
            let known = self
                .outstanding
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&(template.as_ptr() as usize));
            assert!(known, "freeing a template this SDK did not allocate (or twice)");
            // SAFETY: allocated in `allocate` as a boxed slice of `len` bytes.
            unsafe {
                drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    template.as_ptr(),
                    len,
                )));
            }
        })
    }
}
