//! NEC Latent SDK components: the abbreviation initializer, the enroll transform
//! and the compare distance.
//!
//! Applications running these against the real SDK must have their working directory
//! set to the SDK's `bin/win/32` folder.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, warn};
use neclatent_sdk::{
    ImageView, LatentSdk, SdkError, VendorBuffer, ELFT_LATENT_QUALITY, ELFT_M_QUALITY,
    ELFT_TENPRINT_QUALITY, MAX_TEMPLATE_SIZE, RESOLUTION_PPI, VERIFY_LEVEL,
};
use thiserror::Error;

use crate::config::ErrorScorePolicy;
use crate::error::Result;
use crate::expression::Call;
use crate::plugin::{Abbreviations, Distance, Initializer, Transform};
use crate::plugins::{check_arity, parse_arg, parse_bool, PluginContext};
use crate::session::SdkSession;
use crate::template::{Mat, Template};

/// Score for pairs that cannot be compared.
pub const MIN_SCORE: f32 = -f32::MAX;

/// Vendor entry point family. Enrollment and comparison must agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Lfml,
    Elft,
    ElftM,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Lfml, Algorithm::Elft, Algorithm::ElftM];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lfml => "LFML",
            Self::Elft => "ELFT",
            Self::ElftM => "ELFT_M",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "LFML" => Ok(Self::Lfml),
            "ELFT" => Ok(Self::Elft),
            "ELFT_M" => Ok(Self::ElftM),
            other => Err(format!("unknown algorithm '{}' (expected LFML, ELFT or ELFT_M)", other)),
        }
    }
}

/// Registers the `NECTenprint*` and `NECLatent*` abbreviations.
#[derive(Debug, Default)]
pub struct NecLatentInitializer;

impl Initializer for NecLatentInitializer {
    fn name(&self) -> &'static str {
        "NECLatent1"
    }

    fn initialize(&self, abbreviations: &mut Abbreviations) {
        let aliases = [
            ("NECTenprintLFML", "Open+Cvt(Gray)+NECLatent1Enroll(false,LFML):NECLatent1Compare(LFML)"),
            ("NECTenprintELFT", "Open+Cvt(Gray)+NECLatent1Enroll(false,ELFT):NECLatent1Compare(ELFT)"),
            ("NECTenprintELFTM", "Open+Cvt(Gray)+NECLatent1Enroll(false,ELFT_M):NECLatent1Compare(ELFT_M)"),
            ("NECLatentLFML", "Open+Cvt(Gray)+NECLatent1Enroll(true,LFML):NECLatent1Compare(LFML)"),
            ("NECLatentELFT", "Open+Cvt(Gray)+NECLatent1Enroll(true,ELFT):NECLatent1Compare(ELFT)"),
            ("NECLatentELFTM", "Open+NECLatent1Enroll(true,ELFT_M):NECLatent1Compare(ELFT_M)"),
        ];
        for (name, expression) in aliases {
            abbreviations.insert(name.to_string(), expression.to_string());
        }
    }
}

#[derive(Error, Debug)]
enum ExtractError {
    #[error(transparent)]
    Vendor(#[from] SdkError),

    #[error("reported template size {0} exceeds {max} bytes", max = MAX_TEMPLATE_SIZE)]
    Oversize(usize),

    #[error("extraction produced an empty template")]
    Empty,
}

/// Result of one extraction call: either bytes in our scratch buffer or a buffer
/// the vendor allocated. A vendor buffer is released exactly once, on drop, so every
/// exit path from an extraction frees it.
struct Extracted<'a> {
    sdk: &'a dyn LatentSdk,
    scratch: Vec<u8>,
    used: usize,
    vendor: Option<VendorBuffer>,
}

impl<'a> Extracted<'a> {
    fn new(sdk: &'a dyn LatentSdk) -> Self {
        Self {
            sdk,
            scratch: Vec::new(),
            used: 0,
            vendor: None,
        }
    }

    /// Run a fixed-buffer extraction into a scratch buffer of the documented maximum.
    fn fixed(
        &mut self,
        call: impl FnOnce(&mut [u8]) -> std::result::Result<usize, SdkError>,
    ) -> std::result::Result<(), ExtractError> {
        self.scratch = vec![0u8; MAX_TEMPLATE_SIZE];
        let size = call(self.scratch.as_mut_slice())?;
        if size > self.scratch.len() {
            return Err(ExtractError::Oversize(size));
        }
        self.used = size;
        Ok(())
    }

    fn bytes(&self) -> &[u8] {
        match &self.vendor {
            Some(buf) => buf.as_slice(),
            None => &self.scratch[..self.used],
        }
    }

    fn to_vec(&self) -> std::result::Result<Vec<u8>, ExtractError> {
        let bytes = self.bytes();
        if bytes.is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(bytes.to_vec())
    }
}

impl Drop for Extracted<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.vendor.take() {
            self.sdk.elft_m_free_template(buf);
        }
    }
}

/// Enrolls an 8-bit grayscale fingerprint image into an NEC template.
///
/// Extractions are serialized through the shared [`SdkSession`]. Vendor errors mark
/// the output failed-to-extract instead of failing the pipeline.
pub struct NecLatentEnroll {
    latent: bool,
    algorithm: Algorithm,
    session: Arc<SdkSession>,
}

impl NecLatentEnroll {
    pub fn new(latent: bool, algorithm: Algorithm, session: Arc<SdkSession>) -> Self {
        Self {
            latent,
            algorithm,
            session,
        }
    }

    pub fn latent(&self) -> bool {
        self.latent
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn extract(
        &self,
        sdk: &dyn LatentSdk,
        image: ImageView<'_>,
    ) -> std::result::Result<Vec<u8>, ExtractError> {
        let mut out = Extracted::new(sdk);
        match (self.latent, self.algorithm) {
            (true, Algorithm::Lfml) => {
                out.fixed(|buf| sdk.lfml_extract_latent(image, RESOLUTION_PPI, buf))?
            }
            (true, Algorithm::Elft) => out.fixed(|buf| {
                sdk.elft_extract_latent(image, RESOLUTION_PPI, ELFT_LATENT_QUALITY, buf)
            })?,
            (true, Algorithm::ElftM) => {
                sdk.elft_m_extract_latent(image, ELFT_M_QUALITY, &mut out.vendor)?
            }
            (false, Algorithm::Lfml) => {
                out.fixed(|buf| sdk.lfml_extract_tenprint(image, RESOLUTION_PPI, buf))?
            }
            (false, Algorithm::Elft) => out.fixed(|buf| {
                sdk.elft_extract_tenprint(image, RESOLUTION_PPI, ELFT_TENPRINT_QUALITY, buf)
            })?,
            (false, Algorithm::ElftM) => sdk.elft_m_extract_tenprint(
                image,
                RESOLUTION_PPI,
                ELFT_M_QUALITY,
                &mut out.vendor,
            )?,
        }
        out.to_vec()
    }
}

impl Transform for NecLatentEnroll {
    fn name(&self) -> &'static str {
        "NECLatent1Enroll"
    }

    fn project(&self, src: &Template) -> Template {
        if !src.m.is_gray8() {
            panic!(
                "NECLatent1Enroll requires 8-bit single-channel data, got {:?} for {}",
                src.m.format, src.file.name
            );
        }
        let (Ok(rows), Ok(cols)) = (i32::try_from(src.m.rows), i32::try_from(src.m.cols)) else {
            panic!(
                "NECLatent1Enroll image {}x{} too large for the SDK: {}",
                src.m.rows, src.m.cols, src.file.name
            );
        };

        let mut dst = src.clone();
        if src.m.is_empty() {
            debug!("NECLatent1Enroll skipping {}: no image data", src.file.name);
            dst.mark_failed();
            return dst;
        }

        let image = ImageView::new(&src.m.data, rows, cols);
        debug!(
            "NECLatent1Enroll {} {} on {}x{} {}",
            if self.latent { "latent" } else { "tenprint" },
            self.algorithm,
            image.rows,
            image.columns,
            src.file.name
        );

        match self.session.enroll(|sdk| self.extract(sdk, image)) {
            Ok(bytes) => dst.m = Mat::from_bytes(bytes),
            Err(e) => {
                warn!("NECLatent1EnrollTransform error {} for file {}.", e, src.file.name);
                dst.mark_failed();
            }
        }
        dst
    }
}

/// `NECLatent1Enroll(latent, algorithm)`, defaulting to tenprint LFML.
pub fn enroll_transform(call: &Call, ctx: &PluginContext) -> Result<Arc<dyn Transform>> {
    check_arity(call, 2)?;
    let latent = parse_bool(call, 0, false)?;
    let algorithm = parse_arg(call, 1, Algorithm::default())?;
    Ok(Arc::new(NecLatentEnroll::new(latent, algorithm, ctx.session.clone())))
}

/// Scores two NEC templates with the vendor's verify call for `algorithm`.
pub struct NecLatentCompare {
    algorithm: Algorithm,
    session: Arc<SdkSession>,
    error_score: ErrorScorePolicy,
}

impl NecLatentCompare {
    pub fn new(
        algorithm: Algorithm,
        session: Arc<SdkSession>,
        error_score: ErrorScorePolicy,
    ) -> Self {
        Self {
            algorithm,
            session,
            error_score,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl Distance for NecLatentCompare {
    fn name(&self) -> &'static str {
        "NECLatent1Compare"
    }

    fn compare(&self, target: &Template, query: &Template) -> f32 {
        if target.m.is_empty() || query.m.is_empty() {
            return MIN_SCORE;
        }
        let (probe, gallery) = (query.m.data.as_slice(), target.m.data.as_slice());

        let mut score = 0;
        let status = self.session.compare(|sdk| match self.algorithm {
            Algorithm::Lfml => sdk.lfml_verify(probe, gallery, &mut score),
            Algorithm::Elft => sdk.elft_verify(probe, gallery, &mut score, VERIFY_LEVEL),
            Algorithm::ElftM => sdk.elft_m_verify(probe, gallery, &mut score, VERIFY_LEVEL),
        });

        match status {
            Ok(()) => score as f32,
            Err(e) => {
                warn!(
                    "NECLatent1CompareDistance error {} comparing {} to {}",
                    e, query.file.name, target.file.name
                );
                match self.error_score {
                    ErrorScorePolicy::Sentinel => MIN_SCORE,
                    ErrorScorePolicy::Vendor => score as f32,
                }
            }
        }
    }
}

/// `NECLatent1Compare(algorithm)`, defaulting to LFML.
pub fn compare_distance(call: &Call, ctx: &PluginContext) -> Result<Arc<dyn Distance>> {
    check_arity(call, 1)?;
    let algorithm = parse_arg(call, 0, Algorithm::default())?;
    Ok(Arc::new(NecLatentCompare::new(
        algorithm,
        ctx.session.clone(),
        ctx.error_score,
    )))
}
