use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::expression::{self, Call};
use crate::pipeline::Pipeline;
use crate::plugin::{Abbreviations, Distance, Initializer, Transform};
use crate::plugins::{self, PluginContext};

pub type TransformFactory = fn(&Call, &PluginContext) -> Result<Arc<dyn Transform>>;
pub type DistanceFactory = fn(&Call, &PluginContext) -> Result<Arc<dyn Distance>>;

/// Named plugins and abbreviations, resolved into pipelines.
///
/// Abbreviations only exist once [`Registry::initialize`] has run the registered
/// initializers.
pub struct Registry {
    context: PluginContext,
    initializers: Vec<Box<dyn Initializer>>,
    transforms: BTreeMap<&'static str, TransformFactory>,
    distances: BTreeMap<&'static str, DistanceFactory>,
    abbreviations: Abbreviations,
    initialized: bool,
}

impl Registry {
    pub fn new(context: PluginContext) -> Self {
        Self {
            context,
            initializers: Vec::new(),
            transforms: BTreeMap::new(),
            distances: BTreeMap::new(),
            abbreviations: Abbreviations::new(),
            initialized: false,
        }
    }

    /// A registry with every built-in plugin registered, not yet initialized.
    pub fn with_builtins(context: PluginContext) -> Self {
        let mut registry = Self::new(context);
        registry.register_initializer(Box::new(plugins::neclatent::NecLatentInitializer));
        registry.register_transform("Open", plugins::open::transform);
        registry.register_transform("Cvt", plugins::cvt::transform);
        registry.register_transform("NECLatent1Enroll", plugins::neclatent::enroll_transform);
        registry.register_distance("NECLatent1Compare", plugins::neclatent::compare_distance);
        registry
    }

    pub fn register_initializer(&mut self, initializer: Box<dyn Initializer>) {
        self.initializers.push(initializer);
    }

    pub fn register_transform(&mut self, name: &'static str, factory: TransformFactory) {
        self.transforms.insert(name, factory);
    }

    pub fn register_distance(&mut self, name: &'static str, factory: DistanceFactory) {
        self.distances.insert(name, factory);
    }

    /// Run every initializer. Later calls are no-ops.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        for initializer in &self.initializers {
            debug!("Running initializer {}", initializer.name());
            initializer.initialize(&mut self.abbreviations);
        }
        self.initialized = true;
        info!("Registered {} abbreviations", self.abbreviations.len());
    }

    pub fn abbreviations(&self) -> &Abbreviations {
        &self.abbreviations
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    /// The expression behind `name`: an abbreviation, or `name` itself if it is
    /// already an expression.
    pub fn expand(&self, name: &str) -> Result<String> {
        if let Some(expression) = self.abbreviations.get(name) {
            return Ok(expression.clone());
        }
        if name.contains(['+', ':', '(']) {
            return Ok(name.to_string());
        }
        Err(Error::UnknownAlgorithm(name.to_string()))
    }

    pub fn transform(&self, call: &Call) -> Result<Arc<dyn Transform>> {
        let factory = self
            .transforms
            .get(call.name.as_str())
            .ok_or_else(|| Error::UnknownPlugin {
                kind: "transform",
                name: call.name.clone(),
            })?;
        factory(call, &self.context)
    }

    pub fn distance(&self, call: &Call) -> Result<Arc<dyn Distance>> {
        let factory = self
            .distances
            .get(call.name.as_str())
            .ok_or_else(|| Error::UnknownPlugin {
                kind: "distance",
                name: call.name.clone(),
            })?;
        factory(call, &self.context)
    }

    /// Build the pipeline for an abbreviation or expression.
    pub fn pipeline(&self, name: &str) -> Result<Pipeline> {
        let expression = self.expand(name)?;
        let parsed = expression::parse(&expression)?;
        let transforms = parsed
            .transforms
            .iter()
            .map(|call| self.transform(call))
            .collect::<Result<Vec<_>>>()?;
        let distance = parsed
            .distance
            .as_ref()
            .map(|call| self.distance(call))
            .transpose()?;
        Ok(Pipeline::new(name, transforms, distance))
    }
}
