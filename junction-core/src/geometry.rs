//! Oriented-rectangle intersection test used to confirm predicted
//! collisions.
//!
//! Coordinates are consumed as plain 2-D `(lat, lon)` pairs: over the few
//! tens of meters a tracked scene spans, the metric distortion from treating
//! degrees as a flat plane is harmless for a yes/no intersection test. This
//! is a direct translation of `geometry_utils.py`'s `do_segments_intersect`
//! / `do_rectangles_intersect`, not a call into `geo`'s general-purpose
//! predicates — the spec requires this exact orientation-test-plus-ray-cast
//! algorithm, parity-independent in both rectangles' corner order.

use crate::footprint::RectangleCorners;
use crate::geodesy::WorldPoint;

fn direction(p1: WorldPoint, p2: WorldPoint, p: WorldPoint) -> f64 {
    (p.lat - p1.lat) * (p2.lon - p1.lon) - (p2.lat - p1.lat) * (p.lon - p1.lon)
}

fn on_segment(p1: WorldPoint, p2: WorldPoint, p: WorldPoint) -> bool {
    p.lat <= p1.lat.max(p2.lat)
        && p.lat >= p1.lat.min(p2.lat)
        && p.lon <= p1.lon.max(p2.lon)
        && p.lon >= p1.lon.min(p2.lon)
}

/// Do segments `p1-p2` and `p3-p4` cross, including touching endpoints?
fn segments_intersect(p1: WorldPoint, p2: WorldPoint, p3: WorldPoint, p4: WorldPoint) -> bool {
    let d1 = direction(p3, p4, p1);
    let d2 = direction(p3, p4, p2);
    let d3 = direction(p1, p2, p3);
    let d4 = direction(p1, p2, p4);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(p3, p4, p1))
        || (d2 == 0.0 && on_segment(p3, p4, p2))
        || (d3 == 0.0 && on_segment(p1, p2, p3))
        || (d4 == 0.0 && on_segment(p1, p2, p4))
}

fn point_in_rectangle(p: WorldPoint, rect: &RectangleCorners) -> bool {
    let mut inside = false;
    let n = rect.len();
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (rect[i].lat, rect[i].lon);
        let (xj, yj) = (rect[j].lat, rect[j].lon);
        if ((yi > p.lon) != (yj > p.lon)) && (p.lat < xi + (xj - xi) * (p.lon - yi) / (yj - yi)) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn edges(rect: &RectangleCorners) -> [(WorldPoint, WorldPoint); 4] {
    [
        (rect[0], rect[1]),
        (rect[1], rect[2]),
        (rect[2], rect[3]),
        (rect[3], rect[0]),
    ]
}

/// Do the two oriented rectangles (given as their four corners, in order)
/// intersect? True if any edge of one crosses any edge of the other, or any
/// corner of one lies inside the other.
pub fn do_rectangles_intersect(rect1: &RectangleCorners, rect2: &RectangleCorners) -> bool {
    let edges1 = edges(rect1);
    let edges2 = edges(rect2);

    for (a1, a2) in edges1.iter() {
        for (b1, b2) in edges2.iter() {
            if segments_intersect(*a1, *a2, *b1, *b2) {
                return true;
            }
        }
    }

    if rect1.iter().any(|&c| point_in_rectangle(c, rect2)) {
        return true;
    }
    if rect2.iter().any(|&c| point_in_rectangle(c, rect1)) {
        return true;
    }

    false
}
