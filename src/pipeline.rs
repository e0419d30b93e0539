use std::sync::Arc;

use crate::error::{Error, Result};
use crate::plugin::{Distance, Transform};
use crate::template::Template;

/// Full pipeline: transforms in order → optional distance
pub struct Pipeline {
    name: String,
    transforms: Vec<Arc<dyn Transform>>,
    distance: Option<Arc<dyn Distance>>,
}

impl Pipeline {
    pub fn new(
        name: impl Into<String>,
        transforms: Vec<Arc<dyn Transform>>,
        distance: Option<Arc<dyn Distance>>,
    ) -> Self {
        Self {
            name: name.into(),
            transforms,
            distance,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform_names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    pub fn has_distance(&self) -> bool {
        self.distance.is_some()
    }

    pub fn distance(&self) -> Option<Arc<dyn Distance>> {
        self.distance.clone()
    }

    /// Run every transform over `src`.
    pub fn enroll(&self, src: Template) -> Template {
        self.transforms
            .iter()
            .fold(src, |template, transform| transform.project(&template))
    }

    /// Enroll the image at `path`; the chain is expected to start with `Open`.
    pub fn enroll_file(&self, path: &str) -> Template {
        self.enroll(Template::from_path(path))
    }

    pub fn compare(&self, target: &Template, query: &Template) -> Result<f32> {
        let distance = self
            .distance
            .as_ref()
            .ok_or_else(|| Error::MissingDistance(self.name.clone()))?;
        Ok(distance.compare(target, query))
    }

    /// Convenience: enroll both images and compare them
    pub fn compare_files(&self, target: &str, query: &str) -> Result<f32> {
        let target = self.enroll_file(target);
        let query = self.enroll_file(query);
        self.compare(&target, &query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{FileMeta, Mat};

    struct Append(u8);

    impl Transform for Append {
        fn name(&self) -> &'static str {
            "Append"
        }

        fn project(&self, src: &Template) -> Template {
            let mut data = src.m.data.clone();
            data.push(self.0);
            Template::new(src.file.clone(), Mat::from_bytes(data))
        }
    }

    struct Length;

    impl Distance for Length {
        fn name(&self) -> &'static str {
            "Length"
        }

        fn compare(&self, target: &Template, query: &Template) -> f32 {
            (target.m.data.len() * 10 + query.m.data.len()) as f32
        }
    }

    #[test]
    fn test_transforms_run_in_order() {
        let transforms: Vec<Arc<dyn Transform>> = vec![Arc::new(Append(1)), Arc::new(Append(2))];
        let pipeline = Pipeline::new("t", transforms, None);
        let out = pipeline.enroll(Template::new(FileMeta::new("x"), Mat::empty()));
        assert_eq!(out.m.data, vec![1, 2]);
        assert!(matches!(
            pipeline.compare(&out, &out),
            Err(Error::MissingDistance(_))
        ));
    }

    #[test]
    fn test_compare_passes_target_then_query() {
        let distance: Arc<dyn Distance> = Arc::new(Length);
        let pipeline = Pipeline::new("t", vec![], Some(distance));
        let target = Template::new(FileMeta::new("t"), Mat::from_bytes(vec![0; 3]));
        let query = Template::new(FileMeta::new("q"), Mat::from_bytes(vec![0; 1]));
        assert_eq!(pipeline.compare(&target, &query).unwrap(), 31.0);
    }
}
