//! Transform trait for sample preprocessing.

use std::sync::Arc;

use crate::error::Result;

/// A transform applied to one field (input or target) of a sample.
///
/// Transforms are shared between dataset views through `Arc`, so they must be
/// `Send + Sync`. A stochastic transform (e.g. an augmentation) is allowed to
/// keep interior state; its randomness is the implementor's responsibility.
///
/// # Example
///
/// ```rust
/// use avl_core::{Result, Transform};
///
/// struct AddOne;
///
/// impl Transform<i64> for AddOne {
///     fn apply(&self, value: i64) -> Result<i64> {
///         Ok(value + 1)
///     }
/// }
///
/// assert_eq!(AddOne.apply(1).unwrap(), 2);
/// ```
pub trait Transform<T>: Send + Sync {
    /// Apply the transform to a value.
    fn apply(&self, value: T) -> Result<T>;

    /// Get the name of this transform for logging/debugging.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A shared, type-erased transform.
pub type SharedTransform<T> = Arc<dyn Transform<T>>;

/// Identity transform that passes values through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T> Transform<T> for Identity {
    fn apply(&self, value: T) -> Result<T> {
        Ok(value)
    }

    fn name(&self) -> &str {
        "Identity"
    }
}

/// A composed transform that applies multiple transforms in sequence.
pub struct Compose<T> {
    transforms: Vec<SharedTransform<T>>,
}

impl<T> Compose<T> {
    /// Create a new empty composition.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Add a transform to the end of the composition.
    pub fn push<X: Transform<T> + 'static>(&mut self, transform: X) {
        self.transforms.push(Arc::new(transform));
    }

    /// Create a composition from shared transforms, applied in order.
    #[must_use]
    pub fn from_vec(transforms: Vec<SharedTransform<T>>) -> Self {
        Self { transforms }
    }

    /// Number of composed transforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether the composition is empty (acts as identity).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl<T> Default for Compose<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Compose<T> {
    fn clone(&self) -> Self {
        Self {
            transforms: self.transforms.clone(),
        }
    }
}

impl<T> Transform<T> for Compose<T> {
    fn apply(&self, mut value: T) -> Result<T> {
        for transform in &self.transforms {
            value = transform.apply(value)?;
        }
        Ok(value)
    }

    fn name(&self) -> &str {
        "Compose"
    }
}

/// A transform backed by a closure.
///
/// ```rust
/// use avl_core::{FnTransform, Transform};
///
/// let double = FnTransform::new("double", |x: f32| Ok(x * 2.0));
/// assert_eq!(double.apply(1.5).unwrap(), 3.0);
/// assert_eq!(Transform::<f32>::name(&double), "double");
/// ```
pub struct FnTransform<F> {
    name: String,
    f: F,
}

impl<F> FnTransform<F> {
    /// Wrap a closure as a named transform.
    pub fn new<T>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(T) -> Result<T> + Send + Sync,
    {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<T, F> Transform<T> for FnTransform<F>
where
    F: Fn(T) -> Result<T> + Send + Sync,
{
    fn apply(&self, value: T) -> Result<T> {
        (self.f)(value)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_identity() {
        assert_eq!(Identity.apply(5_i64).unwrap(), 5);
        assert_eq!(<Identity as Transform<i64>>::name(&Identity), "Identity");
    }

    #[test]
    fn test_compose_order() {
        let mut compose: Compose<i64> = Compose::new();
        compose.push(FnTransform::new("add", |x: i64| Ok(x + 1)));
        compose.push(FnTransform::new("mul", |x: i64| Ok(x * 10)));
        assert_eq!(compose.len(), 2);
        assert_eq!(compose.apply(1).unwrap(), 20);
    }

    #[test]
    fn test_compose_propagates_errors() {
        let mut compose: Compose<i64> = Compose::new();
        compose.push(FnTransform::new("fail", |_x: i64| {
            Err(CoreError::TransformError("boom".into()))
        }));
        compose.push(FnTransform::new("never", |_x: i64| -> Result<i64> {
            unreachable!()
        }));
        assert!(compose.apply(1).is_err());
    }

    #[test]
    fn test_empty_compose_is_identity() {
        let compose: Compose<String> = Compose::default();
        assert!(compose.is_empty());
        assert_eq!(compose.apply("a".to_string()).unwrap(), "a");
    }
}
