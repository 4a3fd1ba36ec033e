use std::time::Duration;

use log::debug;
use pinged_types::geo::GeoPoint2d;
use pinged_types::screen::{exceeds_axis_threshold, ScreenPoint};
use web_time::SystemTime;

use crate::control::{MouseButton, PointerEvent, PointerEventKind, PointerTarget};
use crate::engine::MarkerKey;

const DEFAULT_HOLD_DURATION: Duration = Duration::from_millis(550);
const DEFAULT_MOVE_THRESHOLD: f64 = 6.0;

/// Configuration of a [`GestureDisambiguator`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GestureConfig {
    hold_duration: Duration,
    move_threshold: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            hold_duration: DEFAULT_HOLD_DURATION,
            move_threshold: DEFAULT_MOVE_THRESHOLD,
        }
    }
}

impl GestureConfig {
    /// How long the pointer must be held in place to confirm a hold gesture.
    pub fn hold_duration(&self) -> Duration {
        self.hold_duration
    }

    /// Sets the hold duration.
    pub fn with_hold_duration(mut self, duration: Duration) -> Self {
        self.hold_duration = duration;
        self
    }

    /// Maximum displacement along either axis, in pixels, that still counts as holding in place.
    pub fn move_threshold(&self) -> f64 {
        self.move_threshold
    }

    /// Sets the move threshold.
    pub fn with_move_threshold(mut self, threshold: f64) -> Self {
        self.move_threshold = threshold;
        self
    }
}

/// Identifies the hold timer of one gesture session. A timer firing with a token of a session
/// that is no longer armed is ignored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HoldToken(u64);

/// State of a gesture session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GestureState {
    /// No session was started yet.
    Idle,
    /// Pointer is down and the hold timer is running.
    Armed,
    /// Pointer was held long enough.
    Confirmed,
    /// Pointer was released, moved too far or the interaction was interrupted.
    Cancelled,
}

/// Why an armed session was cancelled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// Pointer moved past the threshold: this is a drag or pan.
    Moved,
    /// Pointer was released before the hold timer fired: this is a quick tap.
    Released,
    /// Pointer left the surface, a second touch started or another button was pressed.
    Interrupted,
    /// A new primary pointer-down started a new session.
    Replaced,
}

/// Result of feeding an event into the [`GestureDisambiguator`].
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// A session was armed. The host must fire the hold timer with the given token after `delay`.
    Armed {
        /// Token of the new session.
        token: HoldToken,
        /// Delay of the hold timer.
        delay: Duration,
    },
    /// An armed session was cancelled. The host may cancel the timer with this token.
    Cancelled {
        /// Token of the cancelled session.
        token: HoldToken,
        /// Reason of the cancellation.
        reason: CancelReason,
    },
    /// Hold gesture confirmed at the location.
    Confirmed {
        /// Geographic location captured when the pointer went down.
        location: GeoPoint2d,
    },
    /// Quick tap on a marker.
    Tap {
        /// Marker that was tapped.
        key: MarkerKey,
    },
    /// Secondary action on the empty map surface.
    DropBeacon {
        /// Location under the pointer.
        location: GeoPoint2d,
    },
    /// Secondary action on a marker.
    RemoveMarker {
        /// Marker under the pointer.
        key: MarkerKey,
    },
}

/// Transient state between a primary pointer-down on the map surface and the end of the gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSession {
    origin: ScreenPoint,
    started_at: SystemTime,
    location: GeoPoint2d,
    token: HoldToken,
    state: GestureState,
}

impl GestureSession {
    /// Screen position where the pointer went down.
    pub fn origin(&self) -> ScreenPoint {
        self.origin
    }

    /// Time the pointer went down.
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Geographic location captured when the pointer went down.
    pub fn location(&self) -> GeoPoint2d {
        self.location
    }

    /// Token of the hold timer.
    pub fn token(&self) -> HoldToken {
        self.token
    }

    /// Current state.
    pub fn state(&self) -> GestureState {
        self.state
    }
}

#[derive(Debug, Clone)]
struct MarkerPress {
    key: MarkerKey,
    origin: ScreenPoint,
}

/// Turns pointer event sequences into gestures.
///
/// Each primary pointer-down on the empty map surface starts a session:
/// `Idle -> Armed -> {Confirmed, Cancelled}`. Only one session may be armed at a time; a new
/// pointer-down replaces the armed one. Primary presses on markers are tracked separately and
/// produce [`GestureOutcome::Tap`] when released in place. Secondary presses act immediately,
/// without any timer.
///
/// Quick taps on the empty map surface produce no outcome other than the cancellation of the
/// session.
#[derive(Debug, Clone, Default)]
pub struct GestureDisambiguator {
    config: GestureConfig,
    session: Option<GestureSession>,
    marker_press: Option<MarkerPress>,
    next_token: u64,
}

impl GestureDisambiguator {
    /// Creates a new disambiguator.
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Configuration of the disambiguator.
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// State of the latest session, or [`GestureState::Idle`] if there was none.
    pub fn state(&self) -> GestureState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(GestureState::Idle)
    }

    /// The latest session.
    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    /// Feeds a pointer event and returns the resulting outcomes in the order they happened.
    pub fn handle(&mut self, event: &PointerEvent, now: SystemTime) -> Vec<GestureOutcome> {
        let mut outcomes = vec![];
        match event.kind {
            PointerEventKind::Down(button) => {
                self.marker_press = None;
                if event.contacts > 1 {
                    outcomes.extend(self.cancel_armed(CancelReason::Interrupted));
                    return outcomes;
                }

                let target = event.target.clone().unwrap_or(PointerTarget::Map);
                match (button, target) {
                    (MouseButton::Left, PointerTarget::Map) => {
                        outcomes.extend(self.cancel_armed(CancelReason::Replaced));
                        if let Some(location) = event.location {
                            outcomes.push(self.arm(event.position, location, now));
                        }
                    }
                    (MouseButton::Left, PointerTarget::Marker(key)) => {
                        outcomes.extend(self.cancel_armed(CancelReason::Replaced));
                        self.marker_press = Some(MarkerPress {
                            key,
                            origin: event.position,
                        });
                    }
                    (MouseButton::Right, PointerTarget::Map) => {
                        outcomes.extend(self.cancel_armed(CancelReason::Interrupted));
                        if let Some(location) = event.location {
                            outcomes.push(GestureOutcome::DropBeacon { location });
                        }
                    }
                    (MouseButton::Right, PointerTarget::Marker(key)) => {
                        outcomes.extend(self.cancel_armed(CancelReason::Interrupted));
                        outcomes.push(GestureOutcome::RemoveMarker { key });
                    }
                    _ => outcomes.extend(self.cancel_armed(CancelReason::Interrupted)),
                }
            }
            PointerEventKind::Move => {
                let threshold = self.config.move_threshold;
                let moved_session = self.session.as_ref().is_some_and(|s| {
                    s.state == GestureState::Armed
                        && exceeds_axis_threshold(&s.origin, &event.position, threshold)
                });
                if moved_session {
                    outcomes.extend(self.cancel_armed(CancelReason::Moved));
                }

                if self
                    .marker_press
                    .as_ref()
                    .is_some_and(|p| exceeds_axis_threshold(&p.origin, &event.position, threshold))
                {
                    self.marker_press = None;
                }
            }
            PointerEventKind::Up(button) => {
                outcomes.extend(self.cancel_armed(CancelReason::Released));
                if let Some(press) = self.marker_press.take() {
                    if button == MouseButton::Left
                        && !exceeds_axis_threshold(
                            &press.origin,
                            &event.position,
                            self.config.move_threshold,
                        )
                    {
                        outcomes.push(GestureOutcome::Tap { key: press.key });
                    }
                }
            }
            PointerEventKind::Cancel => {
                self.marker_press = None;
                outcomes.extend(self.cancel_armed(CancelReason::Interrupted));
            }
        }

        outcomes
    }

    /// Hold timer with the given token fired. Confirms the session if it is still armed.
    pub fn hold_elapsed(&mut self, token: HoldToken) -> Option<GestureOutcome> {
        match &self.session {
            Some(session) if session.token == token => self.confirm(),
            _ => None,
        }
    }

    /// Confirms the armed session if the hold duration has passed by `now`. Can be used instead of
    /// timers by hosts that run a frame loop.
    pub fn tick(&mut self, now: SystemTime) -> Option<GestureOutcome> {
        let session = self.session.as_ref()?;
        if now.duration_since(session.started_at).unwrap_or_default() >= self.config.hold_duration
        {
            self.confirm()
        } else {
            None
        }
    }

    fn arm(&mut self, origin: ScreenPoint, location: GeoPoint2d, now: SystemTime) -> GestureOutcome {
        self.next_token += 1;
        let token = HoldToken(self.next_token);
        self.session = Some(GestureSession {
            origin,
            started_at: now,
            location,
            token,
            state: GestureState::Armed,
        });

        GestureOutcome::Armed {
            token,
            delay: self.config.hold_duration,
        }
    }

    fn confirm(&mut self) -> Option<GestureOutcome> {
        let session = self.session.as_mut()?;
        if session.state != GestureState::Armed {
            return None;
        }

        session.state = GestureState::Confirmed;
        debug!("Hold gesture confirmed at {:?}", session.location);
        Some(GestureOutcome::Confirmed {
            location: session.location,
        })
    }

    fn cancel_armed(&mut self, reason: CancelReason) -> Option<GestureOutcome> {
        let session = self.session.as_mut()?;
        if session.state != GestureState::Armed {
            return None;
        }

        session.state = GestureState::Cancelled;
        Some(GestureOutcome::Cancelled {
            token: session.token,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::BeaconId;
    use assert_matches::assert_matches;
    use pinged_types::latlon;

    fn at(ms: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(ms)
    }

    fn press(x: f64, y: f64) -> PointerEvent {
        PointerEvent::down(MouseButton::Left, ScreenPoint::new(x, y))
            .on(PointerTarget::Map)
            .at(latlon!(1.0, 2.0))
    }

    fn armed_token(outcomes: &[GestureOutcome]) -> HoldToken {
        match outcomes.last() {
            Some(GestureOutcome::Armed { token, .. }) => *token,
            other => panic!("expected armed outcome, got {other:?}"),
        }
    }

    #[test]
    fn hold_in_place_confirms_exactly_once() {
        let mut gestures = GestureDisambiguator::default();
        let outcomes = gestures.handle(&press(100.0, 100.0), at(0));
        assert_matches!(
            outcomes.as_slice(),
            [GestureOutcome::Armed { delay, .. }] if *delay == Duration::from_millis(550)
        );
        let token = armed_token(&outcomes);
        assert_eq!(gestures.state(), GestureState::Armed);

        assert_eq!(
            gestures.hold_elapsed(token),
            Some(GestureOutcome::Confirmed {
                location: latlon!(1.0, 2.0)
            })
        );
        assert_eq!(gestures.state(), GestureState::Confirmed);

        assert_eq!(gestures.hold_elapsed(token), None);
        assert_eq!(gestures.tick(at(10_000)), None);
        assert!(gestures
            .handle(
                &PointerEvent::up(MouseButton::Left, ScreenPoint::new(100.0, 100.0)),
                at(700)
            )
            .is_empty());
    }

    #[test]
    fn jitter_within_threshold_keeps_session_armed() {
        let mut gestures = GestureDisambiguator::default();
        let token = armed_token(&gestures.handle(&press(100.0, 100.0), at(0)));

        for (x, y) in [(103.0, 98.0), (106.0, 106.0), (94.0, 100.0)] {
            assert!(gestures
                .handle(&PointerEvent::moved(ScreenPoint::new(x, y)), at(100))
                .is_empty());
        }

        assert_eq!(gestures.state(), GestureState::Armed);
        assert_matches!(
            gestures.hold_elapsed(token),
            Some(GestureOutcome::Confirmed { .. })
        );
    }

    #[test]
    fn moving_past_threshold_cancels_and_never_confirms() {
        let mut gestures = GestureDisambiguator::default();
        let token = armed_token(&gestures.handle(&press(100.0, 100.0), at(0)));

        let outcomes = gestures.handle(&PointerEvent::moved(ScreenPoint::new(108.0, 100.0)), at(200));
        assert_eq!(
            outcomes,
            vec![GestureOutcome::Cancelled {
                token,
                reason: CancelReason::Moved
            }]
        );
        assert_eq!(gestures.state(), GestureState::Cancelled);

        assert_eq!(gestures.hold_elapsed(token), None);
        assert_eq!(gestures.tick(at(600)), None);
        assert_eq!(gestures.state(), GestureState::Cancelled);
    }

    #[test]
    fn quick_tap_on_map_only_cancels() {
        let mut gestures = GestureDisambiguator::default();
        let token = armed_token(&gestures.handle(&press(10.0, 10.0), at(0)));

        let outcomes = gestures.handle(
            &PointerEvent::up(MouseButton::Left, ScreenPoint::new(10.0, 10.0)),
            at(120),
        );
        assert_eq!(
            outcomes,
            vec![GestureOutcome::Cancelled {
                token,
                reason: CancelReason::Released
            }]
        );
        assert_eq!(gestures.hold_elapsed(token), None);
    }

    #[test]
    fn tick_confirms_after_hold_duration() {
        let mut gestures = GestureDisambiguator::default();
        gestures.handle(&press(0.0, 0.0), at(1_000));

        assert_eq!(gestures.tick(at(1_549)), None);
        assert_matches!(gestures.tick(at(1_550)), Some(GestureOutcome::Confirmed { .. }));
        assert_eq!(gestures.tick(at(1_600)), None);
    }

    #[test]
    fn new_press_replaces_armed_session() {
        let mut gestures = GestureDisambiguator::default();
        let first = armed_token(&gestures.handle(&press(0.0, 0.0), at(0)));

        let outcomes = gestures.handle(&press(50.0, 50.0), at(100));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            outcomes[0],
            GestureOutcome::Cancelled {
                token: first,
                reason: CancelReason::Replaced
            }
        );
        let second = armed_token(&outcomes);
        assert_ne!(first, second);

        assert_eq!(gestures.hold_elapsed(first), None);
        assert_matches!(
            gestures.hold_elapsed(second),
            Some(GestureOutcome::Confirmed { .. })
        );
    }

    #[test]
    fn multi_touch_and_cancel_interrupt_session() {
        let mut gestures = GestureDisambiguator::default();
        let token = armed_token(&gestures.handle(&press(0.0, 0.0), at(0)));

        let outcomes = gestures.handle(&press(5.0, 5.0).with_contacts(2), at(50));
        assert_eq!(
            outcomes,
            vec![GestureOutcome::Cancelled {
                token,
                reason: CancelReason::Interrupted
            }]
        );

        let token = armed_token(&gestures.handle(&press(0.0, 0.0), at(100)));
        let outcomes = gestures.handle(&PointerEvent::cancel(ScreenPoint::new(0.0, 0.0)), at(150));
        assert_eq!(
            outcomes,
            vec![GestureOutcome::Cancelled {
                token,
                reason: CancelReason::Interrupted
            }]
        );
    }

    #[test]
    fn secondary_actions_are_immediate() {
        let mut gestures = GestureDisambiguator::default();

        let outcomes = gestures.handle(
            &PointerEvent::down(MouseButton::Right, ScreenPoint::new(1.0, 1.0))
                .on(PointerTarget::Map)
                .at(latlon!(3.0, 4.0)),
            at(0),
        );
        assert_eq!(
            outcomes,
            vec![GestureOutcome::DropBeacon {
                location: latlon!(3.0, 4.0)
            }]
        );

        let key = MarkerKey::Beacon(BeaconId::from("b1"));
        let outcomes = gestures.handle(
            &PointerEvent::down(MouseButton::Right, ScreenPoint::new(1.0, 1.0))
                .on(PointerTarget::Marker(key.clone())),
            at(10),
        );
        assert_eq!(outcomes, vec![GestureOutcome::RemoveMarker { key }]);
        assert_eq!(gestures.state(), GestureState::Idle);
    }

    #[test]
    fn tap_on_marker() {
        let mut gestures = GestureDisambiguator::default();
        let key = MarkerKey::Puck;

        let outcomes = gestures.handle(
            &PointerEvent::down(MouseButton::Left, ScreenPoint::new(20.0, 20.0))
                .on(PointerTarget::Marker(key.clone())),
            at(0),
        );
        assert!(outcomes.is_empty());
        assert_eq!(gestures.state(), GestureState::Idle);

        let outcomes = gestures.handle(
            &PointerEvent::up(MouseButton::Left, ScreenPoint::new(22.0, 19.0)),
            at(90),
        );
        assert_eq!(outcomes, vec![GestureOutcome::Tap { key: key.clone() }]);

        gestures.handle(
            &PointerEvent::down(MouseButton::Left, ScreenPoint::new(20.0, 20.0))
                .on(PointerTarget::Marker(key)),
            at(200),
        );
        gestures.handle(&PointerEvent::moved(ScreenPoint::new(40.0, 20.0)), at(250));
        assert!(gestures
            .handle(
                &PointerEvent::up(MouseButton::Left, ScreenPoint::new(40.0, 20.0)),
                at(300)
            )
            .is_empty());
    }

    #[test]
    fn press_without_location_does_not_arm() {
        let mut gestures = GestureDisambiguator::default();
        let outcomes = gestures.handle(
            &PointerEvent::down(MouseButton::Left, ScreenPoint::new(0.0, 0.0)).on(PointerTarget::Map),
            at(0),
        );
        assert!(outcomes.is_empty());
        assert_eq!(gestures.state(), GestureState::Idle);
    }
}
