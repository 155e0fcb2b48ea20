//! Lazy and eager streams of experiences.

use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::error::{Result, ScenarioError};
use crate::experience::CLExperience;

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(0);

fn next_stream_id() -> u64 {
    NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed)
}

/// Back-reference from an experience to the stream that produced it.
///
/// The reference to an eager stream is weak: experiences do not keep their
/// stream alive. Lazy streams cannot be re-read, so their references only
/// carry the name and identity.
pub struct StreamRef<X> {
    name: Arc<str>,
    id: u64,
    experiences: Option<Weak<Vec<CLExperience<X>>>>,
}

impl<X> StreamRef<X> {
    fn detached(name: Arc<str>, id: u64) -> Self {
        Self {
            name,
            id,
            experiences: None,
        }
    }

    /// Name of the stream.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the stream; slices of an eager stream get a new id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The eager stream, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<EagerCLStream<X>> {
        let experiences = self.experiences.as_ref()?.upgrade()?;
        Some(EagerCLStream {
            name: Arc::clone(&self.name),
            id: self.id,
            experiences,
        })
    }
}

impl<X> Clone for StreamRef<X> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            id: self.id,
            experiences: self.experiences.clone(),
        }
    }
}

impl<X> fmt::Debug for StreamRef<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamRef")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish()
    }
}

impl<X> PartialEq for StreamRef<X> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<X> Eq for StreamRef<X> {}

/// A named, single-pass sequence of experiences.
///
/// Experiences are produced on demand. When stream info is enabled, each
/// produced experience is stamped with its position and a reference to this
/// stream as part of the production step. A lazy stream cannot be rewound;
/// materialize it with [`CLStream::into_eager`] when several passes are
/// needed.
pub struct CLStream<X> {
    name: Arc<str>,
    id: u64,
    experiences: Box<dyn Iterator<Item = Result<CLExperience<X>>>>,
    set_stream_info: bool,
    position: usize,
}

impl<X: 'static> CLStream<X> {
    /// Create a stream that stamps the experiences it produces.
    pub fn new(
        name: impl Into<String>,
        experiences: impl Iterator<Item = Result<CLExperience<X>>> + 'static,
    ) -> Self {
        Self::with_stream_info(name, experiences, true)
    }

    /// Create a stream, choosing whether produced experiences are stamped.
    pub fn with_stream_info(
        name: impl Into<String>,
        experiences: impl Iterator<Item = Result<CLExperience<X>>> + 'static,
        set_stream_info: bool,
    ) -> Self {
        Self {
            name: Arc::from(name.into()),
            id: next_stream_id(),
            experiences: Box::new(experiences),
            set_stream_info,
            position: 0,
        }
    }

    /// Name of the stream.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the stream.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Drain the stream into an eager stream with the same name.
    ///
    /// The eager stream stamps the experiences again with itself as origin.
    pub fn into_eager(self) -> Result<EagerCLStream<X>> {
        let name = self.name.to_string();
        let experiences = self.collect::<Result<Vec<_>>>()?;
        Ok(EagerCLStream::new(name, experiences))
    }
}

impl<X: 'static> Iterator for CLStream<X> {
    type Item = Result<CLExperience<X>>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.experiences.next()?;
        let position = self.position;
        self.position += 1;
        if !self.set_stream_info {
            return Some(item);
        }
        let stream = StreamRef::detached(Arc::clone(&self.name), self.id);
        Some(item.map(|exp| exp.stamped(position, stream)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.experiences.size_hint()
    }
}

impl<X> fmt::Debug for CLStream<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CLStream")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// A named, materialized list of experiences.
///
/// Experiences are stamped once, at construction. Slicing yields a new
/// stream whose experiences keep their original position and origin.
///
/// ```rust
/// use avl_data::{ClassificationDataset, VecSource};
/// use avl_scenarios::{CLExperience, EagerCLStream};
///
/// let exps: Vec<_> = (0..4)
///     .map(|class| {
///         let source = VecSource::new(vec![0.0_f32], vec![class]).unwrap();
///         CLExperience::new(ClassificationDataset::from_source(source).unwrap(), vec![0])
///     })
///     .collect();
/// let stream = EagerCLStream::new("train", exps);
///
/// let tail = stream.slice(2..4).unwrap();
/// assert_eq!(tail.len(), 2);
/// assert_eq!(tail.get(0).unwrap().logging().current_experience().unwrap(), 2);
/// ```
pub struct EagerCLStream<X> {
    name: Arc<str>,
    id: u64,
    experiences: Arc<Vec<CLExperience<X>>>,
}

impl<X: 'static> EagerCLStream<X> {
    /// Create a stream and stamp every experience with its position.
    pub fn new(name: impl Into<String>, experiences: Vec<CLExperience<X>>) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let id = next_stream_id();
        let experiences = Arc::new_cyclic(|this: &Weak<Vec<CLExperience<X>>>| {
            experiences
                .iter()
                .enumerate()
                .map(|(i, exp)| {
                    let stream = StreamRef {
                        name: Arc::clone(&name),
                        id,
                        experiences: Some(this.clone()),
                    };
                    exp.stamped(i, stream)
                })
                .collect()
        });
        Self {
            name,
            id,
            experiences,
        }
    }

    /// Create a stream that leaves the experiences as they are.
    pub fn without_stream_info(name: impl Into<String>, experiences: Vec<CLExperience<X>>) -> Self {
        Self {
            name: Arc::from(name.into()),
            id: next_stream_id(),
            experiences: Arc::new(experiences),
        }
    }

    /// Name of the stream.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The same experiences under another name.
    ///
    /// Experiences keep referring to this stream as their origin.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            id: self.id,
            experiences: Arc::clone(&self.experiences),
        }
    }

    /// Identity of the stream.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of experiences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.experiences.len()
    }

    /// Check if the stream has no experiences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiences.is_empty()
    }

    /// The experience at `index`.
    pub fn get(&self, index: usize) -> Result<&CLExperience<X>> {
        self.experiences
            .get(index)
            .ok_or(ScenarioError::ExperienceOutOfRange {
                index,
                length: self.len(),
            })
    }

    /// The experiences in `range`, as a stream with the same name.
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        let length = self.len();
        if range.end > length {
            return Err(ScenarioError::ExperienceOutOfRange {
                index: range.end,
                length,
            });
        }
        let experiences = self.experiences.get(range).unwrap_or_default().to_vec();
        Ok(Self::without_stream_info(self.name.to_string(), experiences))
    }

    /// Iterate over the experiences.
    pub fn iter(&self) -> std::slice::Iter<'_, CLExperience<X>> {
        self.experiences.iter()
    }

    /// All experiences as a slice.
    #[must_use]
    pub fn experiences(&self) -> &[CLExperience<X>] {
        &self.experiences
    }

    /// A lazy stream over the same experiences, without restamping.
    #[must_use]
    pub fn to_lazy(&self) -> CLStream<X> {
        let experiences = Arc::clone(&self.experiences);
        let iter = (0..experiences.len()).map(move |i| Ok(experiences[i].clone()));
        CLStream {
            name: Arc::clone(&self.name),
            id: self.id,
            experiences: Box::new(iter),
            set_stream_info: false,
            position: 0,
        }
    }
}

impl<X> Clone for EagerCLStream<X> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            id: self.id,
            experiences: Arc::clone(&self.experiences),
        }
    }
}

impl<X> fmt::Debug for EagerCLStream<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerCLStream")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("len", &self.experiences.len())
            .finish()
    }
}

impl<'a, X: 'static> IntoIterator for &'a EagerCLStream<X> {
    type Item = &'a CLExperience<X>;
    type IntoIter = std::slice::Iter<'a, CLExperience<X>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avl_data::{ClassificationDataset, VecSource};

    fn experiences(n: i64) -> Vec<CLExperience<f32>> {
        (0..n)
            .map(|class| {
                let source = VecSource::new(vec![0.0, 1.0], vec![class, class]).unwrap();
                CLExperience::new(ClassificationDataset::from_source(source).unwrap(), vec![0])
            })
            .collect()
    }

    #[test]
    fn test_eager_stamps_positions() {
        let stream = EagerCLStream::new("train", experiences(3));
        for (i, exp) in stream.iter().enumerate() {
            let exp = exp.logging();
            assert_eq!(exp.current_experience().unwrap(), i);
            let origin = exp.origin_stream().unwrap();
            assert_eq!(origin.name(), "train");
            assert_eq!(origin.id(), stream.id());
        }
    }

    #[test]
    fn test_origin_upgrades_to_stream() {
        let stream = EagerCLStream::new("test", experiences(2));
        let origin = stream.get(1).unwrap().logging().origin_stream().unwrap().clone();
        let upgraded = origin.upgrade().unwrap();
        assert_eq!(upgraded.len(), 2);
        assert_eq!(upgraded.id(), stream.id());
        drop(upgraded);
        drop(stream);
        assert!(origin.upgrade().is_none());
    }

    #[test]
    fn test_slice_keeps_identity() {
        let stream = EagerCLStream::new("train", experiences(5));
        let slice = stream.slice(1..3).unwrap();
        assert_eq!(slice.name(), "train");
        assert_ne!(slice.id(), stream.id());
        let first = slice.get(0).unwrap().logging();
        assert_eq!(first.current_experience().unwrap(), 1);
        assert_eq!(first.origin_stream().unwrap().id(), stream.id());
    }

    #[test]
    fn test_out_of_range() {
        let stream = EagerCLStream::new("train", experiences(2));
        assert!(matches!(
            stream.get(2),
            Err(ScenarioError::ExperienceOutOfRange { index: 2, length: 2 })
        ));
        assert!(stream.slice(1..3).is_err());
        assert!(stream.slice(2..2).unwrap().is_empty());
    }

    #[test]
    fn test_lazy_stamps_during_iteration() {
        let lazy = CLStream::new("online", experiences(3).into_iter().map(Ok));
        let id = lazy.id();
        let produced: Vec<_> = lazy.map(|e| e.unwrap().logging()).collect();
        assert_eq!(produced.len(), 3);
        assert_eq!(produced[2].current_experience().unwrap(), 2);
        let origin = produced[0].origin_stream().unwrap();
        assert_eq!(origin.id(), id);
        assert!(origin.upgrade().is_none());
    }

    #[test]
    fn test_lazy_without_stream_info() {
        let lazy = CLStream::with_stream_info("raw", experiences(1).into_iter().map(Ok), false);
        let exp = lazy.into_iter().next().unwrap().unwrap().logging();
        assert!(matches!(
            exp.current_experience(),
            Err(ScenarioError::MissingAttribute(_))
        ));
    }

    #[test]
    fn test_to_lazy_and_back() {
        let stream = EagerCLStream::new("train", experiences(2));
        let lazy = stream.to_lazy();
        assert_eq!(lazy.name(), "train");
        let again = lazy.into_eager().unwrap();
        assert_eq!(again.len(), 2);
        assert_ne!(again.id(), stream.id());
    }
}
