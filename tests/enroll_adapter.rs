use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use neclatent::plugins::neclatent::NecLatentEnroll;
use neclatent::{Algorithm, FileMeta, Mat, PixelFormat, SdkSession, Template, Transform};
use neclatent_sdk::fake::{Entry, FakeSdk};
use neclatent_sdk::MAX_TEMPLATE_SIZE;

const MODES: [bool; 2] = [true, false];

fn enroll(sdk: &Arc<FakeSdk>, latent: bool, algorithm: Algorithm) -> NecLatentEnroll {
    NecLatentEnroll::new(latent, algorithm, Arc::new(SdkSession::new(sdk.clone())))
}

fn gray_print(rows: usize, cols: usize) -> Template {
    let data = (0..rows * cols).map(|i| (i % 251) as u8).collect();
    Template::new(
        FileMeta::new("prints/0001.png"),
        Mat::new(rows, cols, PixelFormat::Gray8, data),
    )
}

#[test]
fn test_wrong_pixel_format_fails_fast_without_vendor_call() {
    let inputs = [
        Mat::new(2, 2, PixelFormat::Gray16, vec![0; 8]),
        Mat::new(2, 2, PixelFormat::Rgb8, vec![0; 12]),
        Mat::new(2, 2, PixelFormat::Rgba8, vec![0; 16]),
        Mat::new(0, 0, PixelFormat::Gray16, vec![]),
        Mat::new(0, 0, PixelFormat::Rgb8, vec![]),
        Mat::new(0, 0, PixelFormat::Rgba8, vec![]),
    ];
    for algorithm in Algorithm::ALL {
        for latent in MODES {
            for m in &inputs {
                let sdk = Arc::new(FakeSdk::new());
                let transform = enroll(&sdk, latent, algorithm);
                let src = Template::new(FileMeta::new("color.png"), m.clone());
                let result = panic::catch_unwind(AssertUnwindSafe(|| transform.project(&src)));
                assert!(
                    result.is_err(),
                    "{:?} {}x{} {} {:?} did not abort",
                    m.format,
                    m.rows,
                    m.cols,
                    latent,
                    algorithm
                );
                assert_eq!(sdk.total_calls(), 0);

                // the lock is still usable afterwards
                let ok = transform.project(&gray_print(4, 4));
                assert!(!ok.failed_to_extract());
            }
        }
    }
}

#[test]
fn test_empty_gray_input_is_failed_to_extract() {
    for algorithm in Algorithm::ALL {
        for latent in MODES {
            let sdk = Arc::new(FakeSdk::new());
            let src = Template::new(FileMeta::new("blank.png"), Mat::empty());
            let dst = enroll(&sdk, latent, algorithm).project(&src);
            assert!(dst.failed_to_extract());
            assert_eq!(sdk.total_calls(), 0);
        }
    }
}

#[test]
fn test_output_holds_exactly_the_extracted_bytes() {
    let bytes: Vec<u8> = (0..37).collect();
    for algorithm in Algorithm::ALL {
        for latent in MODES {
            let sdk = Arc::new(FakeSdk::new().with_template(bytes.clone()));
            let dst = enroll(&sdk, latent, algorithm).project(&gray_print(16, 12));
            assert_eq!(dst.m.data, bytes, "{} {:?}", latent, algorithm);
            assert_eq!(dst.m.total(), 37);
            assert!(dst.m.data.len() < MAX_TEMPLATE_SIZE);
            assert!(!dst.failed_to_extract());
        }
    }
}

#[test]
fn test_vendor_failure_marks_failed_to_extract() {
    for algorithm in Algorithm::ALL {
        for latent in MODES {
            let sdk = Arc::new(FakeSdk::new().failing_extraction(-7));
            let dst = enroll(&sdk, latent, algorithm).project(&gray_print(8, 8));
            assert!(dst.m.is_empty(), "{} {:?}", latent, algorithm);
            assert!(dst.failed_to_extract(), "{} {:?}", latent, algorithm);
            assert_eq!(dst.file.name, "prints/0001.png");
            assert_eq!(sdk.calls().iter().filter(|c| c.entry.is_extraction()).count(), 1);
        }
    }
}

#[test]
fn test_vendor_buffer_freed_once_when_allocated() {
    for latent in MODES {
        // success: allocated and freed
        let sdk = Arc::new(FakeSdk::new());
        enroll(&sdk, latent, Algorithm::ElftM).project(&gray_print(8, 8));
        assert_eq!(sdk.allocations(), 1);
        assert_eq!(sdk.count(Entry::ElftMFreeTemplate), 1);
        assert_eq!(sdk.outstanding(), 0);

        // failure without a buffer: nothing to free
        let sdk = Arc::new(FakeSdk::new().failing_extraction(2));
        enroll(&sdk, latent, Algorithm::ElftM).project(&gray_print(8, 8));
        assert_eq!(sdk.allocations(), 0);
        assert_eq!(sdk.count(Entry::ElftMFreeTemplate), 0);

        // failure with a buffer: still freed, exactly once
        let sdk = Arc::new(FakeSdk::new().failing_extraction(2).allocating_on_error());
        let dst = enroll(&sdk, latent, Algorithm::ElftM).project(&gray_print(8, 8));
        assert!(dst.failed_to_extract());
        assert_eq!(sdk.count(Entry::ElftMFreeTemplate), 1);
        assert_eq!(sdk.outstanding(), 0);
    }
}

#[test]
fn test_fixed_buffer_variants_never_free() {
    for algorithm in [Algorithm::Lfml, Algorithm::Elft] {
        for latent in MODES {
            let sdk = Arc::new(FakeSdk::new());
            enroll(&sdk, latent, algorithm).project(&gray_print(8, 8));
            assert_eq!(sdk.count(Entry::ElftMFreeTemplate), 0);
            assert_eq!(sdk.allocations(), 0);
        }
    }
}

#[test]
fn test_free_follows_extraction() {
    let sdk = Arc::new(FakeSdk::new());
    enroll(&sdk, true, Algorithm::ElftM).project(&gray_print(8, 8));
    let calls = sdk.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].entry, Entry::ElftMExtractLatent);
    assert_eq!(calls[1].entry, Entry::ElftMFreeTemplate);
}
