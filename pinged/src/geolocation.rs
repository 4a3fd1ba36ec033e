//! Location sensor collaborator.

use std::collections::VecDeque;
use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;

use crate::error::GeolocationError;
use crate::fix::LocationFix;

/// Result delivered by a location watch.
pub type LocationUpdate = Result<LocationFix, GeolocationError>;

/// Callback receiving location updates.
pub type LocationCallback = Box<dyn FnMut(LocationUpdate)>;

/// Identifies an active location watch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// Device location sensor.
///
/// The sensor calls the callback at its own pace for as long as the watch is active. Failing to
/// start a watch means that live tracking is not available at all.
pub trait GeolocationService {
    /// Starts delivering location updates to the callback.
    fn watch(&mut self, callback: LocationCallback) -> Result<WatchId, GeolocationError>;
    /// Stops a watch. Does nothing if the watch is not active.
    fn clear_watch(&mut self, id: WatchId);
}

/// Sensor of a platform without geolocation support.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedGeolocation;

impl GeolocationService for UnsupportedGeolocation {
    fn watch(&mut self, _callback: LocationCallback) -> Result<WatchId, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }

    fn clear_watch(&mut self, _id: WatchId) {}
}

/// Sensor that delivers the updates it is given. Used to replay recorded tracks.
#[derive(Default)]
pub struct SimulatedGeolocation {
    watchers: Vec<(WatchId, LocationCallback)>,
    next_id: u64,
}

impl SimulatedGeolocation {
    /// Creates a sensor with no watchers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers an update to every active watch.
    pub fn emit(&mut self, update: LocationUpdate) {
        for (_, callback) in &mut self.watchers {
            callback(update.clone());
        }
    }

    /// Number of active watches.
    pub fn watch_count(&self) -> usize {
        self.watchers.len()
    }
}

impl GeolocationService for SimulatedGeolocation {
    fn watch(&mut self, callback: LocationCallback) -> Result<WatchId, GeolocationError> {
        self.next_id += 1;
        let id = WatchId(self.next_id);
        self.watchers.push((id, callback));
        Ok(id)
    }

    fn clear_watch(&mut self, id: WatchId) {
        self.watchers.retain(|(watch_id, _)| *watch_id != id);
    }
}

/// Buffer between the sensor callback and the event loop that owns the
/// [`LiveMap`](crate::LiveMap). Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct LocationQueue {
    updates: Arc<Mutex<VecDeque<LocationUpdate>>>,
}

impl LocationQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback that pushes updates into the queue.
    pub fn callback(&self) -> LocationCallback {
        let updates = self.updates.clone();
        Box::new(move |update| {
            if let Err(err) = &update {
                warn!("Location sensor error: {err}");
            }
            updates.lock().push_back(update);
        })
    }

    /// Removes and returns all queued updates in the order they arrived.
    pub fn drain(&self) -> Vec<LocationUpdate> {
        self.updates.lock().drain(..).collect()
    }

    /// Returns true if there are no queued updates.
    pub fn is_empty(&self) -> bool {
        self.updates.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use web_time::SystemTime;

    #[test]
    fn unsupported_sensor() {
        let queue = LocationQueue::new();
        assert_eq!(
            UnsupportedGeolocation.watch(queue.callback()),
            Err(GeolocationError::Unsupported)
        );
    }

    #[test]
    fn simulated_updates_reach_queue() {
        let mut sensor = SimulatedGeolocation::new();
        let queue = LocationQueue::new();
        let id = sensor.watch(queue.callback()).unwrap();

        sensor.emit(Ok(LocationFix::new(1.0, 2.0, SystemTime::UNIX_EPOCH)));
        sensor.emit(Err(GeolocationError::Unavailable("timeout".into())));

        let updates = queue.drain();
        assert_eq!(updates.len(), 2);
        assert_matches!(updates[0], Ok(_));
        assert_matches!(updates[1], Err(GeolocationError::Unavailable(_)));
        assert!(queue.is_empty());

        sensor.clear_watch(id);
        sensor.emit(Ok(LocationFix::new(1.0, 2.0, SystemTime::UNIX_EPOCH)));
        assert!(queue.is_empty());
        assert_eq!(sensor.watch_count(), 0);
    }
}
