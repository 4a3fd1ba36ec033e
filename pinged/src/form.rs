//! Label input shown after a confirmed hold gesture.

use log::debug;
use pinged_types::geo::{GeoPoint, GeoPoint2d};

use crate::beacon::{Beacon, BeaconStore};
use crate::engine::PopupId;

/// Key pressed in the label input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FormKey {
    /// Commits the label.
    Enter,
    /// Dismisses the form.
    Escape,
    /// Any other key. Text changes are delivered with [`AnnotationFormController::input`].
    Other,
}

/// Open label form.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationForm {
    location: GeoPoint2d,
    text: String,
    popup: Option<PopupId>,
}

impl AnnotationForm {
    /// Location the beacon will be created at.
    pub fn location(&self) -> GeoPoint2d {
        self.location
    }

    /// Current text of the input.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Popup showing the form.
    pub fn popup(&self) -> Option<PopupId> {
        self.popup
    }
}

/// How a form was closed.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// The label was committed.
    Submitted {
        /// The closed form.
        form: AnnotationForm,
        /// Created beacon. `None` if the location was not a valid coordinate.
        beacon: Option<Beacon>,
    },
    /// The form was dismissed without creating a beacon.
    Cancelled {
        /// The closed form.
        form: AnnotationForm,
    },
}

/// Short-lived flow that turns a confirmed hold into a labeled beacon.
///
/// At most one form is open at a time. Opening a new form dismisses the previous one without
/// creating a beacon.
#[derive(Debug, Clone, Default)]
pub struct AnnotationFormController {
    current: Option<AnnotationForm>,
}

impl AnnotationFormController {
    /// Creates a controller with no open form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a form at the location. Returns the form that was open before, if any.
    pub fn open(&mut self, location: GeoPoint2d) -> Option<AnnotationForm> {
        debug!(
            "Opening label form at {:.5}, {:.5}",
            location.lat(),
            location.lon()
        );
        self.current.replace(AnnotationForm {
            location,
            text: String::new(),
            popup: None,
        })
    }

    /// The open form.
    pub fn current(&self) -> Option<&AnnotationForm> {
        self.current.as_ref()
    }

    /// Returns true if a form is open.
    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Associates the open form with the popup that shows it.
    pub fn set_popup(&mut self, popup: PopupId) {
        if let Some(form) = &mut self.current {
            form.popup = Some(popup);
        }
    }

    /// Replaces the text of the input. The input is single-line: a line break commits the text
    /// before it, and the rest is dropped.
    pub fn input(&mut self, text: &str, store: &mut BeaconStore) -> Option<FormEvent> {
        let form = self.current.as_mut()?;
        match text.split_once(['\n', '\r']) {
            Some((line, _)) => {
                form.text = line.to_string();
                self.submit(store)
            }
            None => {
                form.text = text.to_string();
                None
            }
        }
    }

    /// Handles a key press in the input.
    pub fn key(&mut self, key: FormKey, store: &mut BeaconStore) -> Option<FormEvent> {
        match key {
            FormKey::Enter => self.submit(store),
            FormKey::Escape => self.cancel(),
            FormKey::Other => None,
        }
    }

    /// Creates a beacon with the trimmed text as the label and closes the form.
    pub fn submit(&mut self, store: &mut BeaconStore) -> Option<FormEvent> {
        let form = self.current.take()?;
        let label = form.text.trim();
        let beacon = store.create(form.location.lat(), form.location.lon(), label);

        Some(FormEvent::Submitted { form, beacon })
    }

    /// Closes the form without creating a beacon.
    pub fn cancel(&mut self) -> Option<FormEvent> {
        let form = self.current.take()?;
        debug!("Label form cancelled");
        Some(FormEvent::Cancelled { form })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pinged_types::latlon;

    #[test]
    fn submit_trims_label() {
        let mut store = BeaconStore::in_memory();
        let mut forms = AnnotationFormController::new();
        assert!(forms.open(latlon!(1.0, 2.0)).is_none());

        assert!(forms.input("  Lunch spot ", &mut store).is_none());
        assert_eq!(forms.current().map(AnnotationForm::text), Some("  Lunch spot "));

        let event = forms.key(FormKey::Enter, &mut store);
        assert_matches!(event, Some(FormEvent::Submitted { beacon: Some(ref b), .. }) if b.label == "Lunch spot");
        assert!(!forms.is_open());
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].lat, 1.0);
        assert_eq!(store.list()[0].lng, 2.0);
    }

    #[test]
    fn empty_label_is_allowed() {
        let mut store = BeaconStore::in_memory();
        let mut forms = AnnotationFormController::new();
        forms.open(latlon!(1.0, 2.0));

        assert_matches!(
            forms.submit(&mut store),
            Some(FormEvent::Submitted { beacon: Some(ref b), .. }) if b.label.is_empty()
        );
    }

    #[test]
    fn newline_commits() {
        let mut store = BeaconStore::in_memory();
        let mut forms = AnnotationFormController::new();
        forms.open(latlon!(1.0, 2.0));

        let event = forms.input("Cafe\nignored", &mut store);
        assert_matches!(event, Some(FormEvent::Submitted { beacon: Some(ref b), .. }) if b.label == "Cafe");
        assert!(forms.input("more", &mut store).is_none());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn cancel_does_not_create() {
        let mut store = BeaconStore::in_memory();
        let mut forms = AnnotationFormController::new();
        forms.open(latlon!(1.0, 2.0));
        forms.input("Nope", &mut store);

        assert_matches!(forms.key(FormKey::Escape, &mut store), Some(FormEvent::Cancelled { .. }));
        assert!(store.list().is_empty());
        assert!(forms.cancel().is_none());
        assert!(forms.submit(&mut store).is_none());
    }

    #[test]
    fn opening_dismisses_previous() {
        let mut store = BeaconStore::in_memory();
        let mut forms = AnnotationFormController::new();
        forms.open(latlon!(1.0, 2.0));
        forms.set_popup(PopupId(7));
        forms.input("first", &mut store);

        let previous = forms.open(latlon!(3.0, 4.0)).unwrap();
        assert_eq!(previous.popup(), Some(PopupId(7)));
        assert_eq!(previous.text(), "first");

        let current = forms.current().unwrap();
        assert_eq!(current.location(), latlon!(3.0, 4.0));
        assert_eq!(current.text(), "");
        assert!(store.list().is_empty());
    }
}
