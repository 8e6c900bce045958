//! Tolerance-based polyline reduction: an optional radial-distance pre-pass followed by
//! Douglas-Peucker. Output points are always taken from the input, in input order.

use bevy::math::Vec2;

pub fn simplify_polyline(points: &[Vec2], tolerance: f32, high_quality: bool) -> Vec<Vec2> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let sq_tolerance = tolerance * tolerance;
    if high_quality {
        douglas_peucker(points, sq_tolerance)
    } else {
        let reduced = radial_distance_pass(points, sq_tolerance);
        douglas_peucker(&reduced, sq_tolerance)
    }
}

fn radial_distance_pass(points: &[Vec2], sq_tolerance: f32) -> Vec<Vec2> {
    let mut previous = points[0];
    let mut kept = vec![previous];

    for point in &points[1..] {
        if point.distance_squared(previous) > sq_tolerance {
            kept.push(*point);
            previous = *point;
        }
    }

    if let Some(last) = points.last() {
        if previous != *last {
            kept.push(*last);
        }
    }
    kept
}

fn douglas_peucker(points: &[Vec2], sq_tolerance: f32) -> Vec<Vec2> {
    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut ranges = vec![(0_usize, last)];
    while let Some((first, last)) = ranges.pop() {
        let mut max_sq_distance = sq_tolerance;
        let mut farthest = None;

        for index in (first + 1)..last {
            let sq_distance = squared_segment_distance(points[index], points[first], points[last]);
            if sq_distance > max_sq_distance {
                max_sq_distance = sq_distance;
                farthest = Some(index);
            }
        }

        if let Some(index) = farthest {
            keep[index] = true;
            if index - first > 1 {
                ranges.push((first, index));
            }
            if last - index > 1 {
                ranges.push((index, last));
            }
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(point, kept)| kept.then_some(*point))
        .collect()
}

fn squared_segment_distance(point: Vec2, start: Vec2, end: Vec2) -> f32 {
    let mut closest = start;
    let direction = end - start;
    let length_sq = direction.length_squared();

    if length_sq > 0.0 {
        let t = (point - start).dot(direction) / length_sq;
        if t > 1.0 {
            closest = end;
        } else if t > 0.0 {
            closest = start + direction * t;
        }
    }

    point.distance_squared(closest)
}
