//! Per-track kinematic history and the track store that owns every live
//! track plus the pairwise collision prediction over them.
//!
//! The store is the sole owner of its tracks (see the spec's Lifecycle
//! note) — readers only ever see an immutable [`Snapshot`] produced by
//! [`TrackStore::update_from_detection`].

use std::collections::{HashMap, VecDeque};

use crate::collision::{closest_approach_time, predict_position};
use crate::config::TrackingConfig;
use crate::error::CoreError;
use crate::footprint::{vehicle_rectangle, RectangleCorners};
use crate::geodesy::{bearing, cart_to_latlon, latlon_to_cart, CartPoint, WorldPoint};
use crate::geometry::do_rectangles_intersect;

/// A fixed-capacity FIFO: pushing past capacity silently drops the oldest
/// element. Used for the three index-aligned per-track histories.
#[derive(Debug, Clone)]
struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        RingBuffer {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, value: T) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    /// The `n`-th most recent element: `nth_from_end(0)` is the latest.
    fn nth_from_end(&self, n: usize) -> Option<&T> {
        let len = self.buf.len();
        if n >= len {
            return None;
        }
        self.buf.get(len - 1 - n)
    }
}

/// A single tracked vehicle's kinematic history and derived state.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: i64,
    positions: RingBuffer<WorldPoint>,
    cart_positions: RingBuffer<CartPoint>,
    timestamps: RingBuffer<f64>,
    pub velocity: CartPoint,
    pub acceleration: CartPoint,
    pub speed: f64,
    pub heading: f64,
    pub rectangle: Option<RectangleCorners>,
    pub class_id: i32,
    pub class_name: String,
}

impl Track {
    fn new(id: i64, history_size: usize) -> Self {
        Track {
            id,
            positions: RingBuffer::new(history_size),
            cart_positions: RingBuffer::new(history_size),
            timestamps: RingBuffer::new(history_size),
            velocity: CartPoint::new(0.0, 0.0),
            acceleration: CartPoint::new(0.0, 0.0),
            speed: 0.0,
            heading: 0.0,
            rectangle: None,
            class_id: -1,
            class_name: String::from("unknown"),
        }
    }

    /// The most recent world position, if any.
    pub fn latest_position(&self) -> Option<WorldPoint> {
        self.positions.nth_from_end(0).copied()
    }

    /// The most recent Cartesian position, if any.
    pub fn latest_cart_position(&self) -> Option<CartPoint> {
        self.cart_positions.nth_from_end(0).copied()
    }

    /// The most recent timestamp, if any.
    pub fn last_seen(&self) -> Option<f64> {
        self.timestamps.nth_from_end(0).copied()
    }

    /// Number of samples currently held (index-aligned across all three FIFOs).
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Predicted position `dt` seconds ahead under the constant-acceleration
    /// model, converted back to world coordinates via `anchor`.
    pub fn predicted_position(&self, dt: f64, anchor: WorldPoint) -> Option<WorldPoint> {
        let p = self.latest_cart_position()?;
        let future = predict_position(p, self.velocity, self.acceleration, dt);
        Some(cart_to_latlon(future.x, future.y, anchor.lat, anchor.lon))
    }
}

/// Public per-track view returned in a [`Snapshot`].
#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub id: i64,
    pub position: WorldPoint,
    pub speed: f64,
    pub heading: f64,
    pub acceleration: CartPoint,
    pub rectangle: Option<RectangleCorners>,
    pub class_id: i32,
    pub class_name: String,
    pub predicted_position_3s: Option<WorldPoint>,
}

/// A collision risk between two tracks, keyed by the canonical `(min, max)`
/// id pair.
pub type CollisionKey = (i64, i64);

/// The immutable value published once per `update_from_detection` call.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub objects: HashMap<i64, TrackInfo>,
    pub collisions: HashMap<CollisionKey, f64>,
    pub collision_points: HashMap<CollisionKey, WorldPoint>,
}

/// A single detection handed to the store by the upstream detector.
#[derive(Debug, Clone)]
pub struct Detection {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub class_id: i32,
    pub class_name: String,
}

fn canonical_key(a: i64, b: i64) -> CollisionKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Owns every live track and the reference anchor they share, and performs
/// pairwise collision prediction over them.
pub struct TrackStore {
    config: TrackingConfig,
    tracks: HashMap<i64, Track>,
    anchor: Option<WorldPoint>,
}

impl TrackStore {
    pub fn new(config: TrackingConfig) -> Self {
        TrackStore {
            config,
            tracks: HashMap::new(),
            anchor: None,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn anchor(&self) -> Option<WorldPoint> {
        self.anchor
    }

    pub fn track(&self, id: i64) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Update a single track's position history. Pushes `(lat, lon)`
    /// regardless of timing; recomputes velocity/heading/rectangle only when
    /// `t` strictly follows the previous sample, and acceleration only once
    /// three samples are available with both intervening `dt`s positive.
    ///
    /// Returns `Err(StaleOrBackwardTime)` when the velocity refresh was
    /// skipped — the position itself is still retained in history.
    pub fn update(&mut self, id: i64, lat: f64, lon: f64, t: f64) -> Result<(), CoreError> {
        if self.anchor.is_none() {
            self.anchor = Some(WorldPoint::new(lat, lon));
        }
        let anchor = self.anchor.unwrap();

        let history_size = self.config.history_size;
        let track = self
            .tracks
            .entry(id)
            .or_insert_with(|| Track::new(id, history_size));

        track.positions.push(WorldPoint::new(lat, lon));
        let cart = latlon_to_cart(lat, lon, anchor.lat, anchor.lon);
        track.cart_positions.push(cart);
        track.timestamps.push(t);

        if track.len() < 2 {
            return Ok(());
        }

        let t_prev = *track.timestamps.nth_from_end(1).unwrap();
        let t_curr = *track.timestamps.nth_from_end(0).unwrap();
        let dt = t_curr - t_prev;
        if dt <= 0.0 {
            return Err(CoreError::StaleOrBackwardTime {
                prev_t: t_prev,
                new_t: t_curr,
            });
        }

        let cart_prev = *track.cart_positions.nth_from_end(1).unwrap();
        let cart_curr = *track.cart_positions.nth_from_end(0).unwrap();
        let pos_prev = *track.positions.nth_from_end(1).unwrap();
        let pos_curr = *track.positions.nth_from_end(0).unwrap();

        let vx = (cart_curr.x - cart_prev.x) / dt;
        let vy = (cart_curr.y - cart_prev.y) / dt;
        track.velocity = CartPoint::new(vx, vy);
        track.speed = track.velocity.norm();
        track.heading = bearing(pos_prev.lat, pos_prev.lon, pos_curr.lat, pos_curr.lon);
        track.rectangle = Some(vehicle_rectangle(
            pos_curr.lat,
            pos_curr.lon,
            track.heading,
            self.config.car_length,
            self.config.car_width,
        ));

        if track.len() >= 3 {
            let t0 = *track.timestamps.nth_from_end(2).unwrap();
            let t1 = *track.timestamps.nth_from_end(1).unwrap();
            let t2 = *track.timestamps.nth_from_end(0).unwrap();
            let dt1 = t1 - t0;
            let dt2 = t2 - t1;
            if dt1 > 0.0 && dt2 > 0.0 {
                let p0 = *track.cart_positions.nth_from_end(2).unwrap();
                let p1 = *track.cart_positions.nth_from_end(1).unwrap();
                let p2 = *track.cart_positions.nth_from_end(0).unwrap();
                let v1 = CartPoint::new((p1.x - p0.x) / dt1, (p1.y - p0.y) / dt1);
                let v2 = CartPoint::new((p2.x - p1.x) / dt2, (p2.y - p1.y) / dt2);
                let mean_dt = (dt1 + dt2) / 2.0;
                track.acceleration = CartPoint::new(
                    (v2.x - v1.x) / mean_dt,
                    (v2.y - v1.y) / mean_dt,
                );
            }
        }

        Ok(())
    }

    /// Remove every track whose last sample is older than
    /// `now - max_inactive`.
    pub fn sweep(&mut self, now: f64) {
        let max_inactive = self.config.max_inactive;
        self.tracks
            .retain(|_, track| match track.last_seen() {
                Some(last) => now - last <= max_inactive,
                None => false,
            });
    }

    /// Apply a batch of detections, sweep stale tracks, predict collisions,
    /// and return the resulting immutable snapshot. `id < 0` detections
    /// ("untracked") are dropped by the caller before reaching here.
    pub fn update_from_detection(&mut self, detections: &[Detection], now: f64) -> Snapshot {
        for det in detections {
            if self.update(det.id, det.lat, det.lon, now).is_ok() {
                if let Some(track) = self.tracks.get_mut(&det.id) {
                    track.class_id = det.class_id;
                    track.class_name = det.class_name.clone();
                }
            } else if let Some(track) = self.tracks.get_mut(&det.id) {
                track.class_id = det.class_id;
                track.class_name = det.class_name.clone();
            }
        }

        self.sweep(now);

        let (collisions, collision_points) = self.predict_collisions();

        let anchor = self.anchor;
        let mut objects = HashMap::with_capacity(self.tracks.len());
        for (&id, track) in self.tracks.iter() {
            let Some(position) = track.latest_position() else {
                continue;
            };
            let predicted_position_3s = anchor.and_then(|a| track.predicted_position(3.0, a));
            objects.insert(
                id,
                TrackInfo {
                    id,
                    position,
                    speed: track.speed,
                    heading: track.heading,
                    acceleration: track.acceleration,
                    rectangle: track.rectangle,
                    class_id: track.class_id,
                    class_name: track.class_name.clone(),
                    predicted_position_3s,
                },
            );
        }

        Snapshot {
            objects,
            collisions,
            collision_points,
        }
    }

    /// Pairwise collision prediction over every live track pair that both
    /// currently have a footprint rectangle.
    fn predict_collisions(&self) -> (HashMap<CollisionKey, f64>, HashMap<CollisionKey, WorldPoint>) {
        let mut collisions = HashMap::new();
        let mut collision_points = HashMap::new();

        let Some(anchor) = self.anchor else {
            return (collisions, collision_points);
        };

        let ids: Vec<i64> = self.tracks.keys().copied().collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (id_a, id_b) = (ids[i], ids[j]);
                let track_a = &self.tracks[&id_a];
                let track_b = &self.tracks[&id_b];

                let (Some(rect_a), Some(rect_b)) = (track_a.rectangle, track_b.rectangle) else {
                    continue;
                };

                let key = canonical_key(id_a, id_b);

                if do_rectangles_intersect(&rect_a, &rect_b) {
                    let pos_a = track_a.latest_position().unwrap();
                    let pos_b = track_b.latest_position().unwrap();
                    collisions.insert(key, 0.0);
                    collision_points.insert(
                        key,
                        WorldPoint::new((pos_a.lat + pos_b.lat) / 2.0, (pos_a.lon + pos_b.lon) / 2.0),
                    );
                    continue;
                }

                let p_a = track_a.latest_cart_position().unwrap();
                let p_b = track_b.latest_cart_position().unwrap();
                let r = p_b.sub(p_a);
                let v = track_b.velocity.sub(track_a.velocity);
                let a = track_b.acceleration.sub(track_a.acceleration);

                let Ok(Some(tau)) = closest_approach_time(r, v, a, self.config.ttc_threshold) else {
                    continue;
                };

                let Some(future_a) = track_a.predicted_position(tau, anchor) else {
                    continue;
                };
                let Some(future_b) = track_b.predicted_position(tau, anchor) else {
                    continue;
                };

                let future_rect_a = vehicle_rectangle(
                    future_a.lat,
                    future_a.lon,
                    track_a.heading,
                    self.config.car_length,
                    self.config.car_width,
                );
                let future_rect_b = vehicle_rectangle(
                    future_b.lat,
                    future_b.lon,
                    track_b.heading,
                    self.config.car_length,
                    self.config.car_width,
                );

                if do_rectangles_intersect(&future_rect_a, &future_rect_b) {
                    collisions.insert(key, tau);
                    collision_points.insert(
                        key,
                        WorldPoint::new(
                            (future_a.lat + future_b.lat) / 2.0,
                            (future_a.lon + future_b.lon) / 2.0,
                        ),
                    );
                }
            }
        }

        (collisions, collision_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(id: i64, lat: f64, lon: f64) -> Detection {
        Detection {
            id,
            lat,
            lon,
            class_id: 0,
            class_name: "car".to_string(),
        }
    }

    #[test]
    fn histories_stay_index_aligned_and_bounded() {
        let mut config = TrackingConfig::default();
        config.history_size = 3;
        let mut store = TrackStore::new(config);
        for i in 0..10 {
            store.update(1, 37.0 + i as f64 * 0.0001, 126.0, i as f64).unwrap();
        }
        let track = store.track(1).unwrap();
        assert_eq!(track.positions.len(), 3);
        assert_eq!(track.cart_positions.len(), 3);
        assert_eq!(track.timestamps.len(), 3);
    }

    #[test]
    fn rectangle_absent_until_second_sample() {
        let mut store = TrackStore::new(TrackingConfig::default());
        store.update(1, 37.0, 126.0, 0.0).unwrap();
        assert!(store.track(1).unwrap().rectangle.is_none());
        store.update(1, 37.0001, 126.0, 1.0).unwrap();
        assert!(store.track(1).unwrap().rectangle.is_some());
    }

    #[test]
    fn acceleration_zero_until_third_sample() {
        let mut store = TrackStore::new(TrackingConfig::default());
        store.update(1, 37.0, 126.0, 0.0).unwrap();
        store.update(1, 37.0001, 126.0, 1.0).unwrap();
        assert_eq!(store.track(1).unwrap().acceleration, CartPoint::new(0.0, 0.0));
        store.update(1, 37.0003, 126.0, 2.0).unwrap();
        assert_ne!(store.track(1).unwrap().acceleration, CartPoint::new(0.0, 0.0));
    }

    #[test]
    fn nonpositive_dt_is_rejected_but_position_kept() {
        let mut store = TrackStore::new(TrackingConfig::default());
        store.update(1, 37.0, 126.0, 1.0).unwrap();
        let before = store.track(1).unwrap().velocity;
        let result = store.update(1, 37.0005, 126.0005, 1.0);
        assert!(result.is_err());
        let track = store.track(1).unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track.velocity, before);
    }

    #[test]
    fn stale_sweep_removes_only_inactive_tracks() {
        let mut store = TrackStore::new(TrackingConfig::default());
        store.update(1, 37.0, 126.0, 0.0).unwrap();
        store.update(2, 37.001, 126.001, 2.5).unwrap();
        let snapshot = store.update_from_detection(&[det(2, 37.0011, 126.0012)], 4.0);
        assert_eq!(snapshot.objects.len(), 1);
        assert!(snapshot.objects.contains_key(&2));
        assert!(!snapshot.objects.contains_key(&1));
    }

    #[test]
    fn head_on_collision_scenario() {
        let mut config = TrackingConfig::default();
        config.ttc_threshold = 4.0;
        let mut store = TrackStore::new(config);

        let anchor_lat = 37.67676;
        let anchor_lon = 126.74583;

        // Track 1 at x=0 moving +x at 10 m/s; track 2 at x=40 moving -x at 10 m/s.
        for (i, t) in [0.0, 0.5].iter().enumerate() {
            let x1 = 10.0 * t;
            let p1 = cart_to_latlon(x1, 0.0, anchor_lat, anchor_lon);
            store.update(1, p1.lat, p1.lon, *t).unwrap();

            let x2 = 40.0 - 10.0 * t;
            let p2 = cart_to_latlon(x2, 0.0, anchor_lat, anchor_lon);
            store.update(2, p2.lat, p2.lon, *t).unwrap();
            let _ = i;
        }

        let (collisions, points) = store.predict_collisions();
        let key = (1, 2);
        let ttc = *collisions.get(&key).expect("expected a predicted collision");
        // Closed-form closest-approach time is measured from the latest
        // sample (t=0.5), not from the scenario's t=0 description: the raw
        // 40m/20(m/s) closing time is 2.0s from t=0, i.e. 1.5s from t=0.5.
        assert!((ttc - 1.5).abs() < 0.05, "ttc = {ttc}");
        let point = points.get(&key).unwrap();
        let cart = latlon_to_cart(point.lat, point.lon, anchor_lat, anchor_lon);
        assert!((cart.x - 20.0).abs() < 2.0, "meeting x = {}", cart.x);
    }

    #[test]
    fn parallel_tracks_do_not_collide() {
        let mut store = TrackStore::new(TrackingConfig::default());
        let anchor_lat = 37.67676;
        let anchor_lon = 126.74583;

        for t in [0.0, 0.5] {
            let p1 = cart_to_latlon(15.0 * t, 0.0, anchor_lat, anchor_lon);
            store.update(1, p1.lat, p1.lon, t).unwrap();
            let p2 = cart_to_latlon(15.0 * t, 5.0, anchor_lat, anchor_lon);
            store.update(2, p2.lat, p2.lon, t).unwrap();
        }

        let (collisions, _) = store.predict_collisions();
        assert!(collisions.is_empty());
    }

    #[test]
    fn already_overlapping_rectangles_report_zero_ttc() {
        let mut store = TrackStore::new(TrackingConfig::default());
        let anchor_lat = 37.67676;
        let anchor_lon = 126.74583;

        for t in [0.0, 0.5] {
            let p = cart_to_latlon(0.0, 0.0, anchor_lat, anchor_lon);
            store.update(1, p.lat, p.lon, t).unwrap();
            store.update(2, p.lat, p.lon, t).unwrap();
        }

        let (collisions, points) = store.predict_collisions();
        let key = (1, 2);
        assert_eq!(*collisions.get(&key).unwrap(), 0.0);
        let point = points.get(&key).unwrap();
        let expected = store.track(1).unwrap().latest_position().unwrap();
        assert!((point.lat - expected.lat).abs() < 1e-9);
    }

    #[test]
    fn diverging_tracks_report_no_collision() {
        let mut store = TrackStore::new(TrackingConfig::default());
        let anchor_lat = 37.67676;
        let anchor_lon = 126.74583;

        for t in [0.0, 0.5] {
            let p1 = cart_to_latlon(10.0 * t, 0.0, anchor_lat, anchor_lon);
            store.update(1, p1.lat, p1.lon, t).unwrap();
            let p2 = cart_to_latlon(-10.0 * t, 0.0, anchor_lat, anchor_lon);
            store.update(2, p2.lat, p2.lon, t).unwrap();
        }

        let (collisions, _) = store.predict_collisions();
        assert!(collisions.is_empty());
    }
}
