use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + w, y + h),
        }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// True if a circle overlaps the rectangle's interior.
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        center.x + radius > self.min.x
            && center.x - radius < self.max.x
            && center.y + radius > self.min.y
            && center.y - radius < self.max.y
    }

    /// Rectangle shrunk by `margin` on every side. Collapses to the center line when too thin.
    fn inset(&self, margin: f32) -> Rect {
        let mut min = self.min + Vec2::splat(margin);
        let mut max = self.max - Vec2::splat(margin);
        if min.x > max.x {
            let mid = (self.min.x + self.max.x) * 0.5;
            min.x = mid;
            max.x = mid;
        }
        if min.y > max.y {
            let mid = (self.min.y + self.max.y) * 0.5;
            min.y = mid;
            max.y = mid;
        }
        Rect { min, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

/// Static blocking shape. Rotated source shapes are resolved to their bounding box at load time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Obstacle {
    Rect(Rect),
    Circle(Circle),
}

impl Obstacle {
    pub fn scaled(self, factor: f32) -> Self {
        match self {
            Obstacle::Rect(rect) => Obstacle::Rect(rect.scaled(factor)),
            Obstacle::Circle(circle) => Obstacle::Circle(Circle {
                center: circle.center * factor,
                radius: circle.radius * factor,
            }),
        }
    }

    /// Strict overlap test between the obstacle and a circle.
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        match self {
            Obstacle::Rect(rect) => {
                let closest = center.clamp(rect.min, rect.max);
                center.distance(closest) < radius
            }
            Obstacle::Circle(circle) => center.distance(circle.center) < radius + circle.radius,
        }
    }
}

pub fn is_inside_any_zone(point: Vec2, radius: f32, zones: &[Rect]) -> bool {
    zones.iter().any(|zone| zone.overlaps_circle(point, radius))
}

/// Clamps a point that left every zone back into the zone whose clamped candidate is nearest.
///
/// Points that already overlap a zone are returned unchanged.
pub fn resolve_into_nearest_zone(point: Vec2, radius: f32, zones: &[Rect]) -> Vec2 {
    if zones.is_empty() || is_inside_any_zone(point, radius, zones) {
        return point;
    }

    let mut best = point;
    let mut best_dist = f32::INFINITY;
    for zone in zones {
        let inner = zone.inset(radius);
        let candidate = point.clamp(inner.min, inner.max);
        let dist = point.distance_squared(candidate);
        if dist < best_dist {
            best_dist = dist;
            best = candidate;
        }
    }
    best
}

/// Pushes a circle out of every obstacle it overlaps, one pass in obstacle order.
pub fn push_out_of_obstacles(point: Vec2, radius: f32, obstacles: &[Obstacle]) -> Vec2 {
    let mut position = point;
    for obstacle in obstacles {
        match obstacle {
            Obstacle::Rect(rect) => push_out_of_rect(&mut position, radius, rect),
            Obstacle::Circle(circle) => push_out_of_circle(&mut position, radius, circle),
        }
    }
    position
}

fn push_out_of_rect(position: &mut Vec2, radius: f32, rect: &Rect) {
    // Closest point on the rectangle to the circle center.
    let closest = position.clamp(rect.min, rect.max);
    let diff = *position - closest;
    let dist = diff.length();

    if dist >= radius {
        return;
    }

    if dist > f32::EPSILON {
        *position += diff / dist * (radius - dist);
        return;
    }

    // Center sits on or inside the rectangle: leave along the axis of least penetration.
    let left = position.x - rect.min.x;
    let right = rect.max.x - position.x;
    let up = position.y - rect.min.y;
    let down = rect.max.y - position.y;
    let least = left.min(right).min(up).min(down);

    if least == left {
        position.x = rect.min.x - radius;
    } else if least == right {
        position.x = rect.max.x + radius;
    } else if least == up {
        position.y = rect.min.y - radius;
    } else {
        position.y = rect.max.y + radius;
    }
}

fn push_out_of_circle(position: &mut Vec2, radius: f32, circle: &Circle) {
    let diff = *position - circle.center;
    let dist = diff.length();
    let reach = radius + circle.radius;

    if dist >= reach {
        return;
    }

    if dist > f32::EPSILON {
        *position += diff / dist * (reach - dist);
    } else {
        position.x += reach;
    }
}

/// Zone containment followed by obstacle separation, the constraint applied to every moving entity.
pub fn constrain(point: Vec2, radius: f32, zones: &[Rect], obstacles: &[Obstacle]) -> Vec2 {
    let inside = resolve_into_nearest_zone(point, radius, zones);
    push_out_of_obstacles(inside, radius, obstacles)
}

/// True if the segment from `from` to `to` does not cross any obstacle.
pub fn line_of_fire_clear(from: Vec2, to: Vec2, obstacles: &[Obstacle]) -> bool {
    obstacles.iter().all(|obstacle| !segment_hits(from, to, obstacle))
}

fn segment_hits(from: Vec2, to: Vec2, obstacle: &Obstacle) -> bool {
    match obstacle {
        Obstacle::Circle(circle) => {
            let closest = closest_point_on_segment(from, to, circle.center);
            closest.distance(circle.center) < circle.radius
        }
        Obstacle::Rect(rect) => segment_intersects_rect(from, to, rect),
    }
}

fn closest_point_on_segment(a: Vec2, b: Vec2, p: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

// Slab test.
fn segment_intersects_rect(from: Vec2, to: Vec2, rect: &Rect) -> bool {
    let dir = to - from;
    let mut t_min = 0.0_f32;
    let mut t_max = 1.0_f32;

    for axis in 0..2 {
        let (origin, delta, lo, hi) = if axis == 0 {
            (from.x, dir.x, rect.min.x, rect.max.x)
        } else {
            (from.y, dir.y, rect.min.y, rect.max.y)
        };

        if delta.abs() <= f32::EPSILON {
            if origin <= lo || origin >= hi {
                return false;
            }
            continue;
        }

        let inv = 1.0 / delta;
        let mut t1 = (lo - origin) * inv;
        let mut t2 = (hi - origin) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return false;
        }
    }
    true
}
