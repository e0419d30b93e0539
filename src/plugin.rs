use std::collections::BTreeMap;

use crate::template::Template;

/// Abbreviation name to algorithm expression.
pub type Abbreviations = BTreeMap<String, String>;

/// Runs once when the registry is initialized, before any abbreviation is resolved.
pub trait Initializer: Send + Sync {
    fn name(&self) -> &'static str;

    fn initialize(&self, abbreviations: &mut Abbreviations);
}

/// Maps one template to another.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    fn project(&self, src: &Template) -> Template;
}

/// Scores a query template against a target. Higher is more similar.
pub trait Distance: Send + Sync {
    fn name(&self) -> &'static str;

    fn compare(&self, target: &Template, query: &Template) -> f32;
}
