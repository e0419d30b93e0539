use std::sync::Arc;

use log::warn;

use crate::error::Result;
use crate::expression::Call;
use crate::plugin::Transform;
use crate::plugins::{check_arity, PluginContext};
use crate::template::{Mat, Template};

/// Loads the image named by the template's file.
#[derive(Debug, Default)]
pub struct OpenTransform;

impl Transform for OpenTransform {
    fn name(&self) -> &'static str {
        "Open"
    }

    fn project(&self, src: &Template) -> Template {
        let mut dst = src.clone();
        match image::open(&src.file.name) {
            Ok(img) => dst.m = Mat::from_image(&img),
            Err(e) => {
                warn!("Open failed to read {}: {}", src.file.name, e);
                dst.mark_failed();
            }
        }
        dst
    }
}

pub fn transform(call: &Call, _ctx: &PluginContext) -> Result<Arc<dyn Transform>> {
    check_arity(call, 0)?;
    Ok(Arc::new(OpenTransform))
}
