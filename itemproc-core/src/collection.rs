//! # Collections
//!
//! An ordered, immutable sequence of [`Stage`]s that is itself a
//! [`Processor`], so collections nest inside other collections.
//!
//! How values flow through the stages is decided by the collection's
//! [`Mode`]:
//!
//! - [`MapCompose`] applies each stage to every value and flattens array
//!   results into the next stage's input.
//! - [`Compose`] threads one value through the stages, stopping early when
//!   the value equals a configured sentinel.
//!
//! Every operation that would change a collection returns a new one. The
//! mode's settings live in the collection's context next to any extra keys.
//! The extra keys, merged with the call's overrides, are forwarded to
//! processor stages; the mode's own keys are not.

use crate::{
    context::{Context, LayeredContext},
    error::{CollectionError, ContextMergeConflict, DefinitionError, Error, ProcessError},
    processor::Processor,
    stage::Stage,
    value::{extend_flat, to_values},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{cmp::Ordering, fmt, marker::PhantomData, ops::Add, ops::Index, slice};

/// How a collection moves values through its stages.
///
/// The mode's fields are its context keys; they can be overridden per
/// collection and per call like any processor setting.
pub trait Mode: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name used when rendering the collection.
    const NAME: &'static str;

    /// Run `values` through `stages`, passing `context` to processor stages.
    fn apply(&self, stages: &[Stage], values: Value, context: &Context) -> Result<Value, ProcessError>;
}

/// Apply each stage to every value, flattening array results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapMode {}

impl Mode for MapMode {
    const NAME: &'static str = "MapCompose";

    fn apply(&self, stages: &[Stage], values: Value, context: &Context) -> Result<Value, ProcessError> {
        let mut values = to_values(values);
        for stage in stages {
            let mut next = Vec::with_capacity(values.len());
            for value in values {
                let produced = stage
                    .run(value.clone(), context)
                    .map_err(|failure| failure.into_element(Self::NAME, stage, value))?;
                extend_flat(&mut next, produced);
            }
            values = next;
        }
        Ok(Value::Array(values))
    }
}

/// Thread one value through the stages in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceMode {
    /// Stop as soon as the value equals `stop_value`.
    pub stop_early: bool,
    /// The sentinel checked before each stage.
    pub stop_value: Value,
    /// Returned instead of the sentinel when stopping early.
    pub default: Value,
}

impl Default for ReduceMode {
    fn default() -> Self {
        Self {
            stop_early: true,
            stop_value: Value::Null,
            default: Value::Null,
        }
    }
}

impl Mode for ReduceMode {
    const NAME: &'static str = "Compose";

    fn apply(&self, stages: &[Stage], values: Value, context: &Context) -> Result<Value, ProcessError> {
        let mut value = values;
        for stage in stages {
            if self.stop_early && value == self.stop_value {
                #[cfg(feature = "tracing")]
                tracing::trace!(stage = %stage, "stopping early");
                return Ok(self.default.clone());
            }
            value = stage
                .run(value.clone(), context)
                .map_err(|failure| failure.into_element(Self::NAME, stage, value))?;
        }
        Ok(value)
    }
}

/// Apply each stage to every value, flattening results.
pub type MapCompose = Collection<MapMode>;

/// Thread a value through the stages, with an early stop.
pub type Compose = Collection<ReduceMode>;

/// An immutable, ordered sequence of stages.
pub struct Collection<M: Mode> {
    stages: Vec<Stage>,
    context: Context,
    mode: PhantomData<M>,
}

impl<M: Mode> Collection<M> {
    /// A collection with the mode's default context.
    pub fn new(stages: impl IntoIterator<Item = Stage>) -> Result<Self, DefinitionError> {
        Ok(Self {
            stages: stages.into_iter().collect(),
            context: Context::from_config(M::NAME, &M::default())?,
            mode: PhantomData,
        })
    }

    /// A collection whose context layers `context` over the mode's defaults.
    ///
    /// Extra keys are kept and forwarded to processor stages.
    pub fn with_context(
        stages: impl IntoIterator<Item = Stage>,
        context: impl Into<Context>,
    ) -> Result<Self, Error> {
        let defaults = Context::from_config(M::NAME, &M::default())?;
        let overrides = context.into();
        let layered = LayeredContext::new(&overrides, &defaults);
        // Fail at construction rather than on first call.
        layered.unpack::<M>()?;
        Ok(Self {
            stages: stages.into_iter().collect(),
            context: layered.flatten(),
            mode: PhantomData,
        })
    }

    fn derive(&self, stages: Vec<Stage>) -> Self {
        Self {
            stages,
            context: self.context.clone(),
            mode: PhantomData,
        }
    }

    /// The collection's context, mode settings included.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The stages in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the collection has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The stage at `index`.
    pub fn get(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    /// The stages in `range`.
    pub fn get_range(&self, range: std::ops::Range<usize>) -> Option<&[Stage]> {
        self.stages.get(range)
    }

    /// Iterate over the stages.
    pub fn iter(&self) -> slice::Iter<'_, Stage> {
        self.stages.iter()
    }

    /// Whether an equal stage is present.
    pub fn contains(&self, stage: &Stage) -> bool {
        self.stages.contains(stage)
    }

    /// Position of the first equal stage.
    pub fn position(&self, stage: &Stage) -> Option<usize> {
        self.stages.iter().position(|s| s == stage)
    }

    /// A copy with `stage` appended.
    pub fn with_appended(&self, stage: impl Into<Stage>) -> Self {
        let mut stages = self.stages.clone();
        stages.push(stage.into());
        self.derive(stages)
    }

    /// A copy with `stage` inserted before `index`.
    pub fn with_inserted(&self, index: usize, stage: impl Into<Stage>) -> Result<Self, CollectionError> {
        if index > self.len() {
            return Err(self.out_of_range(index));
        }
        let mut stages = self.stages.clone();
        stages.insert(index, stage.into());
        Ok(self.derive(stages))
    }

    /// A copy with the stage at `index` replaced.
    pub fn with_replaced(&self, index: usize, stage: impl Into<Stage>) -> Result<Self, CollectionError> {
        if index >= self.len() {
            return Err(self.out_of_range(index));
        }
        let mut stages = self.stages.clone();
        stages[index] = stage.into();
        Ok(self.derive(stages))
    }

    /// A copy without the first stage equal to `stage`.
    pub fn with_removed(&self, stage: &Stage) -> Result<Self, CollectionError> {
        let index = self
            .position(stage)
            .ok_or_else(|| CollectionError::StageNotFound(stage.describe()))?;
        self.with_removed_at(index)
    }

    /// A copy without the stage at `index`.
    pub fn with_removed_at(&self, index: usize) -> Result<Self, CollectionError> {
        self.with_popped_at(index).map(|(collection, _)| collection)
    }

    /// A copy without the last stage, and that stage.
    pub fn with_popped(&self) -> Result<(Self, Stage), CollectionError> {
        match self.len() {
            0 => Err(self.out_of_range(0)),
            len => self.with_popped_at(len - 1),
        }
    }

    /// A copy without the stage at `index`, and that stage.
    pub fn with_popped_at(&self, index: usize) -> Result<(Self, Stage), CollectionError> {
        if index >= self.len() {
            return Err(self.out_of_range(index));
        }
        let mut stages = self.stages.clone();
        let removed = stages.remove(index);
        Ok((self.derive(stages), removed))
    }

    /// A copy with no stages and the same context.
    pub fn with_cleared(&self) -> Self {
        self.derive(Vec::new())
    }

    /// A copy with the stages in reverse order.
    pub fn with_reversed(&self) -> Self {
        let mut stages = self.stages.clone();
        stages.reverse();
        self.derive(stages)
    }

    /// A copy with the stages sorted by `compare`.
    ///
    /// The sort is stable.
    pub fn with_sorted_by<F>(&self, compare: F) -> Self
    where
        F: FnMut(&Stage, &Stage) -> Ordering,
    {
        let mut stages = self.stages.clone();
        stages.sort_by(compare);
        self.derive(stages)
    }

    /// A copy with the stages sorted by a key.
    pub fn with_sorted_by_key<K, F>(&self, key: F) -> Self
    where
        K: Ord,
        F: FnMut(&Stage) -> K,
    {
        let mut stages = self.stages.clone();
        stages.sort_by_key(key);
        self.derive(stages)
    }

    /// A copy with more stages appended.
    ///
    /// Extending with another collection also merges its context, which
    /// fails if both contexts set a key to different values.
    pub fn extend(&self, other: impl Into<Extension<M>>) -> Result<Self, ContextMergeConflict> {
        let mut stages = self.stages.clone();
        match other.into() {
            Extension::Stages(more) => {
                stages.extend(more);
                Ok(self.derive(stages))
            }
            Extension::Collection(collection) => {
                let context = self.context.merge(&collection.context)?;
                stages.extend(collection.stages);
                Ok(Self {
                    stages,
                    context,
                    mode: PhantomData,
                })
            }
        }
    }

    fn out_of_range(&self, index: usize) -> CollectionError {
        CollectionError::IndexOutOfRange {
            index,
            len: self.len(),
        }
    }
}

impl<M: Mode> Processor for Collection<M> {
    fn name(&self) -> &str {
        M::NAME
    }

    fn default_context(&self) -> Result<Context, DefinitionError> {
        Ok(self.context.clone())
    }

    fn process(&self, values: Value, overrides: &Context) -> Result<Value, ProcessError> {
        let layered = LayeredContext::new(overrides, &self.context);
        let mode: M = layered.unpack()?;
        // Mode settings belong to the collection; stages keep their own.
        let mode_keys = Context::from_config(M::NAME, &M::default())?;
        let forwarded: Context = layered
            .flatten()
            .into_iter()
            .filter(|(key, _)| !mode_keys.contains_key(key))
            .collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(collection = M::NAME, stages = self.stages.len(), "running collection");

        let result = mode.apply(&self.stages, values, &forwarded);

        #[cfg(feature = "tracing")]
        if let Err(err) = &result {
            tracing::debug!(collection = M::NAME, error = %err, "collection failed");
        }

        result
    }

    fn dyn_eq(&self, other: &dyn Processor) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| self == other)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl<M: Mode> Clone for Collection<M> {
    fn clone(&self) -> Self {
        self.derive(self.stages.clone())
    }
}

impl<M: Mode> PartialEq for Collection<M> {
    fn eq(&self, other: &Self) -> bool {
        self.context == other.context && self.stages == other.stages
    }
}

impl<M: Mode> fmt::Display for Collection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", M::NAME)?;
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{stage}")?;
        }
        f.write_str(")")
    }
}

impl<M: Mode> fmt::Debug for Collection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(M::NAME)
            .field("stages", &self.stages)
            .field("context", &self.context)
            .finish()
    }
}

impl<M: Mode> Index<usize> for Collection<M> {
    type Output = Stage;

    fn index(&self, index: usize) -> &Stage {
        &self.stages[index]
    }
}

impl<'a, M: Mode> IntoIterator for &'a Collection<M> {
    type Item = &'a Stage;
    type IntoIter = slice::Iter<'a, Stage>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}

/// What can be appended to a collection of mode `M`.
pub enum Extension<M: Mode> {
    /// Bare stages; the collection's context is kept.
    Stages(Vec<Stage>),
    /// Another collection of the same mode; contexts are merged.
    Collection(Collection<M>),
}

impl<M: Mode> From<Stage> for Extension<M> {
    fn from(stage: Stage) -> Self {
        Extension::Stages(vec![stage])
    }
}

impl<M: Mode> From<Vec<Stage>> for Extension<M> {
    fn from(stages: Vec<Stage>) -> Self {
        Extension::Stages(stages)
    }
}

impl<M: Mode, const N: usize> From<[Stage; N]> for Extension<M> {
    fn from(stages: [Stage; N]) -> Self {
        Extension::Stages(stages.into())
    }
}

impl<M: Mode> From<Collection<M>> for Extension<M> {
    fn from(collection: Collection<M>) -> Self {
        Extension::Collection(collection)
    }
}

impl<M: Mode> From<&Collection<M>> for Extension<M> {
    fn from(collection: &Collection<M>) -> Self {
        Extension::Collection(collection.clone())
    }
}

impl<M: Mode, E: Into<Extension<M>>> Add<E> for &Collection<M> {
    type Output = Result<Collection<M>, ContextMergeConflict>;

    fn add(self, rhs: E) -> Self::Output {
        self.extend(rhs)
    }
}

impl<M: Mode, E: Into<Extension<M>>> Add<E> for Collection<M> {
    type Output = Result<Collection<M>, ContextMergeConflict>;

    fn add(self, rhs: E) -> Self::Output {
        self.extend(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::TransformError,
        invoke,
        processor::ProcessorExt,
        stage::{func, try_func},
        stages,
    };
    use serde_json::json;

    fn strip(value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        }
    }

    fn lower(value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(s.to_lowercase()),
            other => other,
        }
    }

    fn split(value: Value) -> Value {
        match value {
            Value::String(s) => s.split(',').map(|part| json!(part)).collect(),
            other => other,
        }
    }

    fn nothing(_: Value) -> Value {
        Value::Null
    }

    /// Appends `suffix`, which a collection can override.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Suffix {
        suffix: String,
    }

    impl Processor for Suffix {
        fn name(&self) -> &str {
            "Suffix"
        }

        fn default_context(&self) -> Result<Context, DefinitionError> {
            Context::from_config(self.name(), self)
        }

        fn process(&self, values: Value, overrides: &Context) -> Result<Value, ProcessError> {
            invoke::each(self, values, overrides, |value: String, context: &Self| {
                Ok(format!("{value}{}", context.suffix))
            })
        }
    }

    /// Returns `default` in place of an empty batch.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct OrDefault {
        default: Value,
    }

    impl Processor for OrDefault {
        fn name(&self) -> &str {
            "OrDefault"
        }

        fn default_context(&self) -> Result<Context, DefinitionError> {
            Context::from_config(self.name(), self)
        }

        fn process(&self, values: Value, overrides: &Context) -> Result<Value, ProcessError> {
            invoke::bulk(self, values, overrides, |values: Vec<Value>, context: &Self| {
                Ok(values.into_iter().next().unwrap_or_else(|| context.default.clone()))
            })
        }
    }

    #[test]
    fn test_map_pipeline() {
        let pipeline = MapCompose::new(stages![func(strip), func(lower)]).unwrap();
        assert_eq!(
            pipeline.apply(json!(["  Hello", "World  "]), ()).unwrap(),
            json!(["hello", "world"])
        );
    }

    #[test]
    fn test_map_flattens_and_drops_nulls() {
        let pipeline = MapCompose::new(stages![func(split), func(strip)]).unwrap();
        assert_eq!(
            pipeline.apply("a, b,c", ()).unwrap(),
            json!(["a", "b", "c"])
        );
        let dropping = MapCompose::new(stages![func(nothing), func(strip)]).unwrap();
        assert_eq!(dropping.apply(json!(["x", "y"]), ()).unwrap(), json!([]));
    }

    #[test]
    fn test_reduce_short_circuits() {
        let pipeline = Compose::with_context(stages![func(nothing), func(strip)], [("default", "N/A")]).unwrap();
        assert_eq!(pipeline.apply(" x ", ()).unwrap(), json!("N/A"));

        let keep_going = Compose::with_context(
            stages![func(nothing), func(strip)],
            [("stop_early", json!(false))],
        )
        .unwrap();
        assert_eq!(keep_going.apply(" x ", ()).unwrap(), Value::Null);
    }

    #[test]
    fn test_reduce_passes_whole_value() {
        let pipeline = Compose::new(stages![func(strip), func(lower)]).unwrap();
        assert_eq!(pipeline.apply(" ABC ", ()).unwrap(), json!("abc"));
    }

    #[test]
    fn test_context_is_forwarded_to_processor_stages() {
        let pipeline = MapCompose::with_context(stages![Suffix::default()], [("suffix", "!")]).unwrap();
        assert_eq!(pipeline.apply("hi", ()).unwrap(), json!(["hi!"]));
        assert_eq!(pipeline.apply("hi", [("suffix", "?")]).unwrap(), json!(["hi?"]));
    }

    #[test]
    fn test_mode_settings_stay_with_the_collection() {
        let fallback = OrDefault { default: json!("fallback") };
        let pipeline = Compose::new(stages![fallback]).unwrap();
        assert_eq!(pipeline.apply(json!([]), ()).unwrap(), json!("fallback"));

        // Call-time mode settings are not forwarded either.
        assert_eq!(
            pipeline.apply(json!([]), [("default", "other")]).unwrap(),
            json!("fallback")
        );

        // Extra keys still are.
        let tagged = Compose::with_context(stages![Suffix::default()], [("suffix", "!"), ("default", "-")])
            .unwrap();
        assert_eq!(tagged.apply("hi", ()).unwrap(), json!(["hi!"]));
    }

    #[test]
    fn test_inner_collection_keeps_its_default() {
        let inner = Compose::with_context(stages![func(nothing), func(strip)], [("default", "N/A")]).unwrap();
        let outer = Compose::new(stages![inner]).unwrap();
        assert_eq!(outer.apply(" x ", ()).unwrap(), json!("N/A"));
    }

    #[test]
    fn test_stage_failure_is_wrapped() {
        let pipeline = MapCompose::new(stages![
            func(strip),
            try_func(|_| Err(TransformError::new("ValueError", "bad value")))
        ])
        .unwrap();
        let err = pipeline.apply(json!([" a "]), ()).unwrap_err();
        let ProcessError::Element(element) = err else {
            panic!("expected an element error, got {err:?}");
        };
        assert_eq!(element.collection, "MapCompose");
        assert_eq!(element.value, json!("a"));
        assert_eq!(element.kind, "ValueError");
        assert_eq!(element.message, "bad value");
    }

    #[test]
    fn test_extend_is_associative() {
        let a = MapCompose::new(stages![func(strip)]).unwrap();
        let b = MapCompose::new(stages![func(lower)]).unwrap();
        let c = MapCompose::new(stages![func(split)]).unwrap();

        let left = ((&a + &b).unwrap() + &c).unwrap();
        let right = (&a + (&b + &c).unwrap()).unwrap();
        assert_eq!(left, right);
        assert_eq!(left.to_string(), "MapCompose(strip, lower, split)");
    }

    #[test]
    fn test_extend_merges_or_refuses_contexts() {
        let a = MapCompose::with_context(stages![func(strip)], [("foo", "bar")]).unwrap();
        let same = MapCompose::with_context(stages![func(lower)], [("foo", "bar")]).unwrap();
        let other = MapCompose::with_context(stages![func(lower)], [("foo", "baz")]).unwrap();

        let merged = (&a + &same).unwrap();
        assert_eq!(merged.context().get("foo"), Some(&json!("bar")));
        assert_eq!(merged.len(), 2);

        let err = (&a + &other).unwrap_err();
        assert_eq!(err.key, "foo");
    }

    #[test]
    fn test_adding_a_stage_keeps_context() {
        let a = MapCompose::with_context(stages![func(strip)], [("foo", "bar")]).unwrap();
        let extended = (&a + Stage::from(Suffix::default())).unwrap();
        assert_eq!(extended.context(), a.context());
        assert_eq!(extended.len(), 2);
    }

    #[test]
    fn test_persistent_operations_leave_original_intact() {
        let original = MapCompose::new(stages![func(strip), func(lower)]).unwrap();

        assert!(original.with_cleared().is_empty());
        assert_eq!(original.with_appended(func(split)).len(), 3);
        assert_eq!(original.with_reversed()[0], func(lower));
        assert_eq!(
            original.with_inserted(0, func(split)).unwrap()[0],
            func(split)
        );
        assert_eq!(
            original.with_replaced(1, func(split)).unwrap()[1],
            func(split)
        );
        let (popped, last) = original.with_popped().unwrap();
        assert_eq!(popped.len(), 1);
        assert_eq!(last, func(lower));
        assert_eq!(original.with_removed(&func(strip)).unwrap()[0], func(lower));

        assert_eq!(original.len(), 2);
        assert_eq!(original.to_string(), "MapCompose(strip, lower)");
    }

    #[test]
    fn test_positional_errors() {
        let original = MapCompose::new(stages![func(strip)]).unwrap();
        assert_eq!(
            original.with_inserted(3, func(lower)).unwrap_err(),
            CollectionError::IndexOutOfRange { index: 3, len: 1 }
        );
        assert!(matches!(
            original.with_removed(&func(lower)),
            Err(CollectionError::StageNotFound(name)) if name == "lower"
        ));
        assert!(original.with_cleared().with_popped().is_err());
    }

    #[test]
    fn test_sorting_and_lookup() {
        let original = MapCompose::new(stages![func(strip), func(lower), func(split)]).unwrap();
        let sorted = original.with_sorted_by_key(|stage| stage.describe());
        assert_eq!(sorted.to_string(), "MapCompose(lower, split, strip)");
        assert!(original.contains(&func(split)));
        assert_eq!(original.position(&func(lower)), Some(1));
        assert_eq!(original.get_range(1..3).map(<[Stage]>::len), Some(2));
        assert!(original.get(5).is_none());
    }

    #[test]
    fn test_nested_collections() {
        let inner = MapCompose::new(stages![func(strip)]).unwrap();
        let outer = MapCompose::new(stages![inner.clone(), func(lower)]).unwrap();
        assert_eq!(outer.apply(json!([" A "]), ()).unwrap(), json!(["a"]));
        assert_eq!(outer.to_string(), "MapCompose(MapCompose(strip), lower)");
        assert_eq!(outer[0], Stage::from(inner));
    }

    #[test]
    fn test_equality_covers_context() {
        let a = MapCompose::new(stages![func(strip)]).unwrap();
        let b = MapCompose::new(stages![func(strip)]).unwrap();
        let c = MapCompose::with_context(stages![func(strip)], [("foo", 1)]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_mode_setting_is_rejected() {
        let err = Compose::with_context(stages![func(strip)], [("stop_early", "sometimes")]).unwrap_err();
        assert!(matches!(err, Error::Context(_)));
    }
}
