//! Persistent point annotations ("beacons").

use std::fmt::{Display, Formatter};

use log::{debug, info, warn};
use pinged_types::geo::{GeoPoint, GeoPoint2d, NewGeoPoint};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

mod storage;

pub use storage::{FileStorage, MemoryStorage, PersistentStorage};

/// Key under which the whole beacon collection is stored.
pub const BEACON_STORAGE_KEY: &str = "pinged_beacons_v1";

/// Unique identifier of a beacon. Time-ordered, so sorting ids gives creation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeaconId(String);

impl BeaconId {
    /// Generates a new unique id from the current time and random bits.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// String representation of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BeaconId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for BeaconId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// User-created point annotation with an optional label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    /// Immutable identifier.
    pub id: BeaconId,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Label, possibly empty.
    #[serde(default)]
    pub label: String,
}

impl Beacon {
    /// Position of the beacon.
    pub fn position(&self) -> GeoPoint2d {
        GeoPoint2d::latlon(self.lat, self.lng)
    }

    /// Label to show to the user: the beacon label or `Beacon` if it is empty.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            "Beacon"
        } else {
            &self.label
        }
    }
}

/// Owner of the beacon collection.
///
/// The collection is read from the storage once, when the store is created. Every mutation is
/// written to the storage before the mutating method returns, so a crash can lose only the
/// mutation in progress. If the storage cannot be read or written, the store keeps working in
/// memory for the rest of the session.
pub struct BeaconStore {
    beacons: Vec<Beacon>,
    storage: Option<Box<dyn PersistentStorage>>,
}

impl BeaconStore {
    /// Loads the collection from the storage. Missing or corrupt data gives an empty collection.
    pub fn load(storage: Box<dyn PersistentStorage>) -> Self {
        let blob = match storage.get(BEACON_STORAGE_KEY) {
            Ok(blob) => blob,
            Err(err) => {
                warn!("Failed to read stored beacons, continuing without persistence: {err}");
                return Self::in_memory();
            }
        };

        let beacons = blob.map(|blob| decode_beacons(&blob)).unwrap_or_default();
        info!("Loaded {} beacons", beacons.len());

        Self {
            beacons,
            storage: Some(storage),
        }
    }

    /// Creates an empty store that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            beacons: vec![],
            storage: None,
        }
    }

    /// Adds a new beacon to the end of the collection.
    ///
    /// Returns `None` without changing anything if the coordinates are invalid.
    pub fn create(&mut self, lat: f64, lng: f64, label: impl Into<String>) -> Option<Beacon> {
        if !GeoPoint2d::latlon(lat, lng).is_valid() {
            debug!("Ignoring beacon with invalid coordinates: {lat}, {lng}");
            return None;
        }

        let beacon = Beacon {
            id: BeaconId::generate(),
            lat,
            lng,
            label: label.into(),
        };
        self.beacons.push(beacon.clone());
        info!("Beacon {} created at {lat}, {lng}", beacon.id);
        self.persist();

        Some(beacon)
    }

    /// Removes the beacon with the given id. Does nothing if there is no such beacon.
    pub fn delete(&mut self, id: &BeaconId) -> Option<Beacon> {
        let index = self.beacons.iter().position(|b| &b.id == id)?;
        let removed = self.beacons.remove(index);
        info!("Beacon {id} deleted");
        self.persist();

        Some(removed)
    }

    /// Removes all beacons and returns their ids. Markers of these beacons must be removed by the
    /// caller.
    pub fn clear(&mut self) -> Vec<BeaconId> {
        let removed: Vec<BeaconId> = self.beacons.drain(..).map(|b| b.id).collect();
        info!("Cleared {} beacons", removed.len());
        self.persist();

        removed
    }

    /// All beacons in creation order.
    pub fn list(&self) -> &[Beacon] {
        &self.beacons
    }

    /// Beacon with the given id.
    pub fn get(&self, id: &BeaconId) -> Option<&Beacon> {
        self.beacons.iter().find(|b| &b.id == id)
    }

    /// Returns true if mutations are still written to the storage.
    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    fn persist(&mut self) {
        let Some(storage) = &self.storage else {
            return;
        };

        let result = serde_json::to_string(&self.beacons)
            .map_err(StorageError::from)
            .and_then(|blob| storage.insert(BEACON_STORAGE_KEY, &blob));

        if let Err(err) = result {
            warn!("Failed to persist beacons, continuing without persistence: {err}");
            self.storage = None;
        }
    }
}

fn decode_beacons(blob: &str) -> Vec<Beacon> {
    match serde_json::from_str::<Vec<Beacon>>(blob) {
        Ok(beacons) => beacons
            .into_iter()
            .filter(|b| {
                let valid = b.position().is_valid();
                if !valid {
                    debug!("Dropping stored beacon {} with invalid coordinates", b.id);
                }
                valid
            })
            .collect(),
        Err(err) => {
            warn!("Stored beacons are corrupt, starting with an empty collection: {err}");
            vec![]
        }
    }
}
