//! Observer callbacks for change tracking.

use crate::change_set::ChangeRecord;
use crate::results::FetchedResults;
use alloc::boxed::Box;
use core::fmt;

/// Callback invoked before or after a batch of changes.
pub type ContentCallback = Box<dyn FnMut(&FetchedResults)>;

/// Callback invoked once per change record.
pub type ObjectCallback = Box<dyn FnMut(&FetchedResults, &ChangeRecord)>;

/// Receives the changes of a tracking controller.
///
/// Every callback is optional. An observer with at least one callback
/// turns tracking on; without `on_did_change_object` the controller keeps
/// its results current but skips building change records.
///
/// `will_change_content` sees the results as they were before the batch,
/// the other two see them after. Callbacks get read-only access and must
/// not call back into the controller that is notifying them.
///
/// # Example
///
/// ```
/// use multifetch_reactive::{ChangeKind, ResultsObserver};
///
/// let observer = ResultsObserver::new()
///     .on_did_change_object(|_results, record| {
///         if record.kind() == ChangeKind::Insert {
///             // insert a row at record.new_position()
///         }
///     });
/// assert!(observer.tracks_changes());
/// ```
#[derive(Default)]
pub struct ResultsObserver {
    will_change_content: Option<ContentCallback>,
    did_change_object: Option<ObjectCallback>,
    did_change_content: Option<ContentCallback>,
}

impl ResultsObserver {
    /// Creates an observer with no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the callback invoked before each batch.
    pub fn on_will_change_content<F>(mut self, f: F) -> Self
    where
        F: FnMut(&FetchedResults) + 'static,
    {
        self.will_change_content = Some(Box::new(f));
        self
    }

    /// Sets the callback invoked for each change record.
    pub fn on_did_change_object<F>(mut self, f: F) -> Self
    where
        F: FnMut(&FetchedResults, &ChangeRecord) + 'static,
    {
        self.did_change_object = Some(Box::new(f));
        self
    }

    /// Sets the callback invoked after each batch.
    pub fn on_did_change_content<F>(mut self, f: F) -> Self
    where
        F: FnMut(&FetchedResults) + 'static,
    {
        self.did_change_content = Some(Box::new(f));
        self
    }

    /// Returns true if any callback is set.
    pub fn tracks_changes(&self) -> bool {
        self.will_change_content.is_some()
            || self.did_change_object.is_some()
            || self.did_change_content.is_some()
    }

    /// Returns true if per-record callbacks are wanted.
    #[inline]
    pub fn wants_records(&self) -> bool {
        self.did_change_object.is_some()
    }

    pub(crate) fn will_change(&mut self, results: &FetchedResults) {
        if let Some(f) = self.will_change_content.as_mut() {
            f(results);
        }
    }

    pub(crate) fn did_change_object(&mut self, results: &FetchedResults, record: &ChangeRecord) {
        if let Some(f) = self.did_change_object.as_mut() {
            f(results, record);
        }
    }

    pub(crate) fn did_change(&mut self, results: &FetchedResults) {
        if let Some(f) = self.did_change_content.as_mut() {
            f(results);
        }
    }
}

impl fmt::Debug for ResultsObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultsObserver")
            .field("will_change_content", &self.will_change_content.is_some())
            .field("did_change_object", &self.did_change_object.is_some())
            .field("did_change_content", &self.did_change_content.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::Cell;

    #[test]
    fn test_empty_observer_does_not_track() {
        let observer = ResultsObserver::new();
        assert!(!observer.tracks_changes());
        assert!(!observer.wants_records());
    }

    #[test]
    fn test_any_callback_enables_tracking() {
        assert!(ResultsObserver::new().on_will_change_content(|_| {}).tracks_changes());
        assert!(ResultsObserver::new().on_did_change_content(|_| {}).tracks_changes());

        let observer = ResultsObserver::new().on_did_change_object(|_, _| {});
        assert!(observer.tracks_changes());
        assert!(observer.wants_records());
    }

    #[test]
    fn test_callbacks_are_invoked() {
        let calls = Rc::new(Cell::new(0));
        let (a, b) = (calls.clone(), calls.clone());
        let mut observer = ResultsObserver::new()
            .on_will_change_content(move |_| a.set(a.get() + 1))
            .on_did_change_content(move |_| b.set(b.get() + 10));

        let results = FetchedResults::default();
        observer.will_change(&results);
        observer.did_change(&results);
        assert_eq!(calls.get(), 11);
    }

    #[test]
    fn test_debug_shows_presence() {
        let observer = ResultsObserver::new().on_did_change_content(|_| {});
        let text = alloc::format!("{:?}", observer);
        assert!(text.contains("did_change_content: true"));
        assert!(text.contains("will_change_content: false"));
    }
}
