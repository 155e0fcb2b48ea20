//! Named groups of (input, target) transforms.

use std::fmt;
use std::sync::Arc;

use avl_core::{Compose, SharedTransform, Transform};
use indexmap::IndexMap;

use crate::error::{DataError, Result};

/// Name of the training transform group.
pub const TRAIN_GROUP: &str = "train";
/// Name of the evaluation transform group.
pub const EVAL_GROUP: &str = "eval";

/// A pair of optional transforms, one for the input and one for the target.
///
/// A missing side is the identity.
pub struct TransformPair<X, Y> {
    input: Option<SharedTransform<X>>,
    target: Option<SharedTransform<Y>>,
}

impl<X, Y> TransformPair<X, Y> {
    /// Create a pair from optional transforms.
    #[must_use]
    pub fn new(input: Option<SharedTransform<X>>, target: Option<SharedTransform<Y>>) -> Self {
        Self { input, target }
    }

    /// The identity pair.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(None, None)
    }

    /// A pair transforming only the input.
    pub fn input_only(transform: impl Transform<X> + 'static) -> Self {
        Self::new(Some(Arc::new(transform)), None)
    }

    /// A pair transforming only the target.
    pub fn target_only(transform: impl Transform<Y> + 'static) -> Self {
        Self::new(None, Some(Arc::new(transform)))
    }

    /// The input transform, if any.
    #[must_use]
    pub fn input(&self) -> Option<&SharedTransform<X>> {
        self.input.as_ref()
    }

    /// The target transform, if any.
    #[must_use]
    pub fn target(&self) -> Option<&SharedTransform<Y>> {
        self.target.as_ref()
    }

    /// Whether both sides are the identity.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.input.is_none() && self.target.is_none()
    }

    /// Apply the pair to a sample.
    pub fn apply(&self, input: X, target: Y) -> Result<(X, Y)> {
        let input = match &self.input {
            Some(t) => t.apply(input)?,
            None => input,
        };
        let target = match &self.target {
            Some(t) => t.apply(target)?,
            None => target,
        };
        Ok((input, target))
    }
}

impl<X: 'static, Y: 'static> TransformPair<X, Y> {
    /// A pair that applies `self` first, then `next`.
    #[must_use]
    pub fn then(&self, next: &Self) -> Self {
        Self {
            input: chain(&self.input, &next.input),
            target: chain(&self.target, &next.target),
        }
    }
}

fn chain<T: 'static>(
    first: &Option<SharedTransform<T>>,
    second: &Option<SharedTransform<T>>,
) -> Option<SharedTransform<T>> {
    match (first, second) {
        (None, None) => None,
        (Some(t), None) | (None, Some(t)) => Some(Arc::clone(t)),
        (Some(a), Some(b)) => Some(Arc::new(Compose::from_vec(vec![
            Arc::clone(a),
            Arc::clone(b),
        ]))),
    }
}

impl<X, Y> Clone for TransformPair<X, Y> {
    fn clone(&self) -> Self {
        Self {
            input: self.input.clone(),
            target: self.target.clone(),
        }
    }
}

impl<X, Y> Default for TransformPair<X, Y> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<X, Y> fmt::Debug for TransformPair<X, Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPair")
            .field("input", &self.input.as_ref().map(|t| t.name().to_string()))
            .field("target", &self.target.as_ref().map(|t| t.name().to_string()))
            .finish()
    }
}

/// The transform groups of one dataset layer plus the currently active one.
///
/// A layer built without groups is *empty*: every group name resolves to the
/// identity. Otherwise a group that is not defined is also the identity when
/// the dataset switches to it, but a direct lookup through
/// [`apply_group`](Self::apply_group) fails.
///
/// Frozen transforms are applied after the active group and survive group
/// switches.
pub struct TransformGroups<X, Y> {
    groups: IndexMap<String, TransformPair<X, Y>>,
    current: String,
    frozen: TransformPair<X, Y>,
}

impl<X, Y> TransformGroups<X, Y> {
    /// Groups without any transform, starting in the `train` group.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            groups: IndexMap::new(),
            current: TRAIN_GROUP.to_string(),
            frozen: TransformPair::identity(),
        }
    }

    /// Create groups from named pairs, starting in `current`.
    pub fn new(
        groups: impl IntoIterator<Item = (String, TransformPair<X, Y>)>,
        current: impl Into<String>,
    ) -> Self {
        let groups: IndexMap<_, _> = groups.into_iter().collect();
        for name in groups.keys() {
            warn_on_test_group(name);
        }
        let current = current.into();
        warn_on_test_group(&current);
        Self {
            groups,
            current,
            frozen: TransformPair::identity(),
        }
    }

    /// Use the same pair for both the `train` and `eval` groups.
    #[must_use]
    pub fn uniform(pair: TransformPair<X, Y>) -> Self {
        Self::new(
            [
                (TRAIN_GROUP.to_string(), pair.clone()),
                (EVAL_GROUP.to_string(), pair),
            ],
            TRAIN_GROUP,
        )
    }

    /// Separate pairs for the `train` and `eval` groups.
    #[must_use]
    pub fn train_eval(train: TransformPair<X, Y>, eval: TransformPair<X, Y>) -> Self {
        Self::new(
            [
                (TRAIN_GROUP.to_string(), train),
                (EVAL_GROUP.to_string(), eval),
            ],
            TRAIN_GROUP,
        )
    }

    /// Whether no group was defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Whether every group (and the frozen pair) is the identity.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.frozen.is_identity() && self.groups.values().all(TransformPair::is_identity)
    }

    /// The name of the active group.
    #[must_use]
    pub fn current_group(&self) -> &str {
        &self.current
    }

    /// Names of the defined groups, in definition order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.keys().map(String::as_str)
    }

    /// Whether `name` is a defined group.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// The pair of a defined group.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TransformPair<X, Y>> {
        self.groups.get(name)
    }

    /// The frozen pair.
    #[must_use]
    pub fn frozen(&self) -> &TransformPair<X, Y> {
        &self.frozen
    }

    /// Groups with `name` as the active group.
    ///
    /// Fails for a name that is not defined unless the groups are empty.
    pub fn switch_group(&self, name: &str) -> Result<Self> {
        if !self.is_empty() && !self.contains(name) {
            return Err(DataError::UnknownTransformGroup(name.to_string()));
        }
        warn_on_test_group(name);
        Ok(self.switched(name))
    }

    pub(crate) fn switched(&self, name: &str) -> Self {
        Self {
            current: name.to_string(),
            ..self.clone()
        }
    }

    /// Apply the active group, then the frozen pair.
    pub fn apply(&self, input: X, target: Y) -> Result<(X, Y)> {
        let (input, target) = match self.groups.get(&self.current) {
            Some(pair) => pair.apply(input, target)?,
            None => (input, target),
        };
        self.frozen.apply(input, target)
    }

    /// Apply the named group, then the frozen pair.
    pub fn apply_group(&self, name: &str, input: X, target: Y) -> Result<(X, Y)> {
        self.switch_group(name)?.apply(input, target)
    }
}

impl<X: 'static, Y: 'static> TransformGroups<X, Y> {
    /// Groups whose `name` pair is replaced by `pair` (added if missing).
    #[must_use]
    pub fn with_replaced(&self, name: &str, pair: TransformPair<X, Y>) -> Self {
        warn_on_test_group(name);
        let mut groups = self.groups.clone();
        groups.insert(name.to_string(), pair);
        Self {
            groups,
            ..self.clone()
        }
    }

    /// Groups whose `name` pair is followed by `pair`.
    #[must_use]
    pub fn with_appended(&self, name: &str, pair: &TransformPair<X, Y>) -> Self {
        let combined = match self.groups.get(name) {
            Some(existing) => existing.then(pair),
            None => pair.clone(),
        };
        self.with_replaced(name, combined)
    }

    /// Groups with `pair` appended to the frozen transforms.
    #[must_use]
    pub fn with_frozen(&self, pair: &TransformPair<X, Y>) -> Self {
        Self {
            frozen: self.frozen.then(pair),
            ..self.clone()
        }
    }

    /// Bake the active group into the frozen transforms.
    ///
    /// Every group becomes the identity, so the output of the current group
    /// is unchanged while other groups stop applying their own transforms.
    #[must_use]
    pub fn freeze(&self) -> Self {
        let active = self
            .groups
            .get(&self.current)
            .cloned()
            .unwrap_or_default();
        Self {
            groups: self
                .groups
                .keys()
                .map(|name| (name.clone(), TransformPair::identity()))
                .collect(),
            current: self.current.clone(),
            frozen: active.then(&self.frozen),
        }
    }
}

pub(crate) fn warn_on_test_group(name: &str) {
    if name == "test" {
        tracing::warn!(
            "transform group 'test' is treated like any custom group; \
             did you mean '{}'?",
            EVAL_GROUP
        );
    }
}

impl<X, Y> Clone for TransformGroups<X, Y> {
    fn clone(&self) -> Self {
        Self {
            groups: self.groups.clone(),
            current: self.current.clone(),
            frozen: self.frozen.clone(),
        }
    }
}

impl<X, Y> Default for TransformGroups<X, Y> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<X, Y> fmt::Debug for TransformGroups<X, Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformGroups")
            .field("groups", &self.groups)
            .field("current", &self.current)
            .field("frozen", &self.frozen)
            .finish()
    }
}
