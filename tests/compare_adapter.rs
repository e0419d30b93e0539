use std::sync::Arc;

use neclatent::config::ErrorScorePolicy;
use neclatent::plugins::neclatent::NecLatentCompare;
use neclatent::{Algorithm, Distance, FileMeta, Mat, SdkSession, Template, MIN_SCORE};
use neclatent_sdk::fake::{Entry, FakeSdk};
use neclatent_sdk::VERIFY_LEVEL;

fn compare(sdk: &Arc<FakeSdk>, algorithm: Algorithm) -> NecLatentCompare {
    NecLatentCompare::new(
        algorithm,
        Arc::new(SdkSession::new(sdk.clone())),
        ErrorScorePolicy::Sentinel,
    )
}

fn templ(name: &str, bytes: &[u8]) -> Template {
    Template::new(FileMeta::new(name), Mat::from_bytes(bytes.to_vec()))
}

#[test]
fn test_empty_template_returns_sentinel_without_vendor_call() {
    let full = templ("full", &[1, 2, 3]);
    let mut failed = templ("failed", &[]);
    failed.mark_failed();

    for algorithm in Algorithm::ALL {
        let sdk = Arc::new(FakeSdk::new().with_score(77));
        let distance = compare(&sdk, algorithm);
        assert_eq!(distance.compare(&failed, &full), MIN_SCORE);
        assert_eq!(distance.compare(&full, &failed), MIN_SCORE);
        assert_eq!(distance.compare(&failed, &failed), MIN_SCORE);
        assert_eq!(sdk.total_calls(), 0);
    }
}

#[test]
fn test_vendor_score_is_returned() {
    let expected = [
        (Algorithm::Lfml, Entry::LfmlVerify),
        (Algorithm::Elft, Entry::ElftVerify),
        (Algorithm::ElftM, Entry::ElftMVerify),
    ];
    for (algorithm, entry) in expected {
        let sdk = Arc::new(FakeSdk::new().with_score(77));
        let score = compare(&sdk, algorithm).compare(&templ("t", &[1; 10]), &templ("q", &[2; 4]));
        assert_eq!(score, 77.0, "{:?}", algorithm);
        assert_eq!(sdk.count(entry), 1);
        assert_eq!(sdk.total_calls(), 1);
    }
}

#[test]
fn test_verify_arguments_per_variant() {
    let (target, query) = (templ("t", &[1; 10]), templ("q", &[2; 4]));

    let sdk = Arc::new(FakeSdk::new());
    compare(&sdk, Algorithm::Lfml).compare(&target, &query);
    assert_eq!(sdk.calls()[0].args, vec![4, 10]);

    for algorithm in [Algorithm::Elft, Algorithm::ElftM] {
        let sdk = Arc::new(FakeSdk::new());
        compare(&sdk, algorithm).compare(&target, &query);
        assert_eq!(sdk.calls()[0].args, vec![4, 10, VERIFY_LEVEL]);
    }
}

#[test]
fn test_vendor_error_returns_sentinel_by_default() {
    for algorithm in Algorithm::ALL {
        let sdk = Arc::new(FakeSdk::new().with_score(77).failing_verify(5));
        let score = compare(&sdk, algorithm).compare(&templ("t", &[1]), &templ("q", &[2]));
        assert_eq!(score, MIN_SCORE);
    }
}

#[test]
fn test_vendor_error_policy_keeps_raw_score() {
    let sdk = Arc::new(FakeSdk::new().with_score(13).failing_verify(5));
    let distance = NecLatentCompare::new(
        Algorithm::ElftM,
        Arc::new(SdkSession::new(sdk.clone())),
        ErrorScorePolicy::Vendor,
    );
    assert_eq!(distance.compare(&templ("t", &[1]), &templ("q", &[2])), 13.0);
}
