use std::sync::Arc;

use image::DynamicImage;
use log::warn;

use crate::error::Result;
use crate::expression::Call;
use crate::plugin::Transform;
use crate::plugins::{check_arity, invalid, PluginContext};
use crate::template::{Mat, Template};

/// Color space conversion. Only `Gray` (8-bit luma) is supported.
#[derive(Debug, Default)]
pub struct GrayTransform;

impl Transform for GrayTransform {
    fn name(&self) -> &'static str {
        "Cvt"
    }

    fn project(&self, src: &Template) -> Template {
        let mut dst = src.clone();
        if src.m.is_empty() || src.m.is_gray8() {
            return dst;
        }
        match src.m.to_image() {
            Some(img) => dst.m = Mat::from_image(&DynamicImage::ImageLuma8(img.to_luma8())),
            None => {
                warn!("Cvt(Gray) got a malformed {:?} matrix for {}", src.m.format, src.file.name);
                dst.mark_failed();
            }
        }
        dst
    }
}

pub fn transform(call: &Call, _ctx: &PluginContext) -> Result<Arc<dyn Transform>> {
    check_arity(call, 1)?;
    match call.arg(0) {
        Some("Gray") => Ok(Arc::new(GrayTransform)),
        Some(other) => Err(invalid(call, format!("unsupported color space '{}'", other))),
        None => Err(invalid(call, "missing color space")),
    }
}
