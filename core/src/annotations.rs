//! Annotation support for schema items
//!
//! Every model item carries an ordered list of annotations. An annotation is
//! an opaque typed value; the list permits duplicates, and callers that want
//! one annotation per concrete type use [`Annotations::set`], which removes
//! any existing annotation of that type before appending the replacement.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::convert::TryFrom;
use std::fmt;
use std::sync::Arc;

use crate::error::{EdmError, Result};

/// Downcasting support for annotation trait objects
pub trait AsAny {
    /// View as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A typed metadata record attached to a schema item
pub trait Annotation: AsAny + fmt::Debug + Send + Sync {
    /// Independent copy for schema cloning; `None` means the clone shares this instance
    fn deep_clone(&self) -> Option<Arc<dyn Annotation>> {
        None
    }

    /// Custom external representation, if this annotation provides one
    fn custom_serializer(&self) -> Option<&dyn CustomAnnotationSerializer> {
        None
    }
}

/// Annotations that can render themselves for an external serializer
pub trait CustomAnnotationSerializer {
    /// Produce the external representation; the model never interprets it
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the payload cannot be rendered.
    fn serialize_annotation(&self) -> Result<String>;
}

/// Payload-free marker annotation, only ever checked for presence
pub trait TagAnnotation: Annotation + Default {}

/// Ordered annotation list
#[derive(Clone, Debug, Default)]
pub struct Annotations {
    items: Vec<Arc<dyn Annotation>>,
}

impl Annotations {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation; duplicates are allowed
    pub fn add(&mut self, annotation: impl Annotation + 'static) {
        self.items.push(Arc::new(annotation));
    }

    /// Append an already shared annotation
    pub fn add_shared(&mut self, annotation: Arc<dyn Annotation>) {
        self.items.push(annotation);
    }

    /// Replace every annotation of type `T` with `annotation`
    pub fn set<T: Annotation + 'static>(&mut self, annotation: T) {
        self.remove::<T>();
        self.add(annotation);
    }

    /// Remove every annotation of type `T`, returning how many were removed
    pub fn remove<T: Annotation + 'static>(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|a| !a.as_ref().as_any().is::<T>());
        before - self.items.len()
    }

    /// First annotation of type `T`
    #[must_use]
    pub fn get<T: Annotation + 'static>(&self) -> Option<&T> {
        self.items
            .iter()
            .find_map(|a| a.as_ref().as_any().downcast_ref::<T>())
    }

    /// Every annotation of type `T`, in insertion order
    pub fn get_all<T: Annotation + 'static>(&self) -> impl Iterator<Item = &T> {
        self.items
            .iter()
            .filter_map(|a| a.as_ref().as_any().downcast_ref::<T>())
    }

    /// Whether an annotation of type `T` is present
    #[must_use]
    pub fn has<T: Annotation + 'static>(&self) -> bool {
        self.get::<T>().is_some()
    }

    /// Attach the tag `T` unless already present
    pub fn add_tag<T: TagAnnotation + 'static>(&mut self) {
        if !self.has::<T>() {
            self.add(T::default());
        }
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Annotation>> {
        self.items.iter()
    }

    /// Number of annotations
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copy for a cloned item: deep-cloned where supported, shared otherwise
    #[must_use]
    pub fn deep_cloned(&self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|a| a.deep_clone().unwrap_or_else(|| Arc::clone(a)))
                .collect(),
        }
    }

    /// External representation of the annotation at `index`
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for an out-of-range index and
    /// [`EdmError::NotSupported`] if the annotation has no custom serializer.
    pub fn serialize_at(&self, index: usize) -> Result<String> {
        let annotation = self.items.get(index).ok_or_else(|| {
            EdmError::invalid_argument(format!(
                "annotation index {index} out of range ({} annotations)",
                self.items.len()
            ))
        })?;
        annotation
            .custom_serializer()
            .ok_or_else(|| {
                EdmError::not_supported(format!("custom serialization of {annotation:?}"))
            })?
            .serialize_annotation()
    }

    /// External representations of every annotation that provides one
    ///
    /// # Errors
    ///
    /// Returns the first serializer failure.
    pub fn serialize_custom(&self) -> Result<Vec<String>> {
        self.items
            .iter()
            .filter_map(|a| a.custom_serializer().map(|s| s.serialize_annotation()))
            .collect()
    }
}

/// Trait for items that carry annotations
pub trait Annotatable {
    /// Get the annotations for this item
    fn annotations(&self) -> &Annotations;

    /// Get a mutable reference to annotations
    fn annotations_mut(&mut self) -> &mut Annotations;

    /// Builder-style [`Annotations::add`]
    #[must_use]
    fn with_annotation(mut self, annotation: impl Annotation + 'static) -> Self
    where
        Self: Sized,
    {
        self.annotations_mut().add(annotation);
        self
    }
}

macro_rules! impl_annotatable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::annotations::Annotatable for $ty {
                fn annotations(&self) -> &$crate::annotations::Annotations {
                    &self.annotations
                }

                fn annotations_mut(&mut self) -> &mut $crate::annotations::Annotations {
                    &mut self.annotations
                }
            }
        )+
    };
}
pub(crate) use impl_annotatable;

/// Value types for key/value annotations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnnotationValue {
    /// String value
    String(String),
    /// Boolean value
    Bool(bool),
    /// Numeric value
    Number(serde_json::Number),
    /// Array of values
    Array(Vec<AnnotationValue>),
    /// Object/map of values
    Object(indexmap::IndexMap<String, AnnotationValue>),
    /// Null value
    Null,
}

/// Free-form `key = value` annotation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyValueAnnotation {
    /// Annotation key
    pub key: String,
    /// Annotation payload
    pub value: AnnotationValue,
}

impl KeyValueAnnotation {
    /// Create a key/value annotation
    pub fn new(key: impl Into<String>, value: impl Into<AnnotationValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Annotation for KeyValueAnnotation {
    fn deep_clone(&self) -> Option<Arc<dyn Annotation>> {
        Some(Arc::new(self.clone()))
    }

    fn custom_serializer(&self) -> Option<&dyn CustomAnnotationSerializer> {
        Some(self)
    }
}

impl CustomAnnotationSerializer for KeyValueAnnotation {
    fn serialize_annotation(&self) -> Result<String> {
        let mut object = serde_json::Map::new();
        object.insert(self.key.clone(), Value::from(self.value.clone()));
        Ok(serde_json::to_string(&Value::Object(object))?)
    }
}

impl From<String> for AnnotationValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for AnnotationValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<bool> for AnnotationValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AnnotationValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i32> for AnnotationValue {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl TryFrom<f64> for AnnotationValue {
    type Error = EdmError;

    fn try_from(n: f64) -> Result<Self> {
        serde_json::Number::from_f64(n)
            .map(AnnotationValue::Number)
            .ok_or_else(|| {
                EdmError::invalid_argument("annotation numbers must be finite (got NaN or infinity)")
            })
    }
}

impl From<Value> for AnnotationValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::String(s),
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::Array(arr) => Self::Array(arr.into_iter().map(AnnotationValue::from).collect()),
            Value::Object(obj) => Self::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, AnnotationValue::from(v)))
                    .collect(),
            ),
            Value::Null => Self::Null,
        }
    }
}

impl From<AnnotationValue> for Value {
    fn from(value: AnnotationValue) -> Self {
        match value {
            AnnotationValue::String(s) => Self::String(s),
            AnnotationValue::Bool(b) => Self::Bool(b),
            AnnotationValue::Number(n) => Self::Number(n),
            AnnotationValue::Array(arr) => Self::Array(arr.into_iter().map(Value::from).collect()),
            AnnotationValue::Object(obj) => {
                Self::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            AnnotationValue::Null => Self::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Generated;

    impl Annotation for Generated {}
    impl TagAnnotation for Generated {}

    #[derive(Debug)]
    struct Label(&'static str);

    impl Annotation for Label {}

    #[test]
    fn test_annotation_value_conversions() {
        let av: AnnotationValue = "test".into();
        assert_eq!(av, AnnotationValue::String("test".to_string()));

        let av: AnnotationValue = true.into();
        assert_eq!(av, AnnotationValue::Bool(true));

        let av: AnnotationValue = 42.into();
        if let AnnotationValue::Number(n) = av {
            assert_eq!(n.as_i64(), Some(42));
        } else {
            panic!("Expected Number");
        }

        assert!(AnnotationValue::try_from(f64::NAN).is_err());
    }

    #[test]
    fn test_duplicates_and_set_by_type() {
        let mut annotations = Annotations::new();
        annotations.add(Label("a"));
        annotations.add(Label("b"));
        assert_eq!(annotations.get_all::<Label>().count(), 2);

        annotations.set(Label("c"));
        let labels: Vec<_> = annotations.get_all::<Label>().map(|l| l.0).collect();
        assert_eq!(labels, vec!["c"]);
    }

    #[test]
    fn test_tags_are_presence_only() {
        let mut annotations = Annotations::new();
        assert!(!annotations.has::<Generated>());
        annotations.add_tag::<Generated>();
        annotations.add_tag::<Generated>();
        assert!(annotations.has::<Generated>());
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations.remove::<Generated>(), 1);
        assert!(annotations.is_empty());
    }

    #[test]
    fn test_custom_serialization() -> Result<()> {
        let mut annotations = Annotations::new();
        annotations.add(KeyValueAnnotation::new("author", "Ada"));
        annotations.add(Label("plain"));

        assert_eq!(annotations.serialize_at(0)?, r#"{"author":"Ada"}"#);
        assert!(matches!(
            annotations.serialize_at(1),
            Err(EdmError::NotSupported(_))
        ));
        assert_eq!(annotations.serialize_custom()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_deep_clone_shares_opaque_annotations() {
        let mut annotations = Annotations::new();
        annotations.add(KeyValueAnnotation::new("k", 1));
        annotations.add(Label("shared"));

        let copy = annotations.deep_cloned();
        let original: Vec<_> = annotations.iter().collect();
        let cloned: Vec<_> = copy.iter().collect();
        assert!(!Arc::ptr_eq(original[0], cloned[0]));
        assert!(Arc::ptr_eq(original[1], cloned[1]));
        assert_eq!(copy.get::<KeyValueAnnotation>(), annotations.get::<KeyValueAnnotation>());
    }
}
