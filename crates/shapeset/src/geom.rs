//! Geometry primitives: bounding boxes and error quadrics.

use nalgebra::Point3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Compute the bounding box of a set of points.
    /// Returns `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bb = Aabb {
            min: first,
            max: first,
        };
        for p in iter {
            bb.min.x = bb.min.x.min(p.x);
            bb.min.y = bb.min.y.min(p.y);
            bb.min.z = bb.min.z.min(p.z);
            bb.max.x = bb.max.x.max(p.x);
            bb.max.y = bb.max.y.max(p.y);
            bb.max.z = bb.max.z.max(p.z);
        }
        Some(bb)
    }

    /// The smallest box containing both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// The box grown by `amount` on every side.
    pub fn expanded(&self, amount: f64) -> Aabb {
        Aabb {
            min: Point3::new(
                self.min.x - amount,
                self.min.y - amount,
                self.min.z - amount,
            ),
            max: Point3::new(
                self.max.x + amount,
                self.max.y + amount,
                self.max.z + amount,
            ),
        }
    }

    /// Whether the boxes overlap (boundary contact counts).
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// The center of the box.
    pub fn center(&self) -> Point3<f64> {
        Point3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// The extent of the largest dimension.
    pub fn max_dimension(&self) -> f64 {
        let d = self.max - self.min;
        d.x.max(d.y).max(d.z)
    }
}

/// Exact-coordinate hash key: the raw bit patterns of a position.
///
/// Coordinate matching during indexing uses exact double equality, so hash
/// keys are the bits themselves.
#[inline]
pub(crate) fn point_key(p: &Point3<f64>) -> [u64; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

/// Symmetric 4x4 error quadric, stored as its upper triangle:
///
/// ```text
/// [a b c d]
/// [  e f g]
/// [    h i]
/// [      j]
/// ```
///
/// The quadratic form `v^T Q v` with `v = [x, y, z, 1]` measures the summed
/// squared distance from the point to the planes accumulated in `Q`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quadric {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
    g: f64,
    h: f64,
    i: f64,
    j: f64,
}

impl Quadric {
    /// The quadric of a plane `ax + by + cz + d = 0`: the outer product of
    /// `[a, b, c, d]` with itself.
    pub fn from_plane(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            a: a * a,
            b: a * b,
            c: a * c,
            d: a * d,
            e: b * b,
            f: b * c,
            g: b * d,
            h: c * c,
            i: c * d,
            j: d * d,
        }
    }

    /// Accumulate another quadric into this one.
    pub fn add(&mut self, other: &Quadric) {
        self.a += other.a;
        self.b += other.b;
        self.c += other.c;
        self.d += other.d;
        self.e += other.e;
        self.f += other.f;
        self.g += other.g;
        self.h += other.h;
        self.i += other.i;
        self.j += other.j;
    }

    /// Evaluate the error `v^T Q v` at a point.
    pub fn evaluate(&self, p: &Point3<f64>) -> f64 {
        let (x, y, z) = (p.x, p.y, p.z);
        self.a * x * x
            + 2.0 * self.b * x * y
            + 2.0 * self.c * x * z
            + 2.0 * self.d * x
            + self.e * y * y
            + 2.0 * self.f * y * z
            + 2.0 * self.g * y
            + self.h * z * z
            + 2.0 * self.i * z
            + self.j
    }

    /// Solve `Q x = (0, 0, 0, 1)^T` with the bottom row of `Q` replaced by
    /// `[0, 0, 0, 1]`, i.e. find the point minimizing `v^T Q v`.
    /// Returns `None` when the system is singular.
    pub fn optimal_point(&self) -> Option<Point3<f64>> {
        // The reduced system is the upper-left 3x3 block against the negated
        // fourth column:
        // [a b c] [x]   [-d]
        // [b e f] [y] = [-g]
        // [c f h] [z]   [-i]
        let det = self.a * (self.e * self.h - self.f * self.f)
            - self.b * (self.b * self.h - self.f * self.c)
            + self.c * (self.b * self.f - self.e * self.c);

        if det.abs() < 1e-10 {
            return None;
        }

        let inv_det = 1.0 / det;
        let m00 = (self.e * self.h - self.f * self.f) * inv_det;
        let m01 = (self.c * self.f - self.b * self.h) * inv_det;
        let m02 = (self.b * self.f - self.c * self.e) * inv_det;
        let m11 = (self.a * self.h - self.c * self.c) * inv_det;
        let m12 = (self.b * self.c - self.a * self.f) * inv_det;
        let m22 = (self.a * self.e - self.b * self.b) * inv_det;

        Some(Point3::new(
            m00 * (-self.d) + m01 * (-self.g) + m02 * (-self.i),
            m01 * (-self.d) + m11 * (-self.g) + m12 * (-self.i),
            m02 * (-self.d) + m12 * (-self.g) + m22 * (-self.i),
        ))
    }
}

/// The plane quadric `Kp` of a triangle: the unit face normal through the
/// face centroid. Returns `None` for degenerate triangles.
pub fn plane_quadric(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Option<Quadric> {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let n = e1.cross(&e2);
    let len = n.norm();
    if len < 1e-10 {
        return None;
    }

    let (a, b, c) = (n.x / len, n.y / len, n.z / len);
    let cx = (p0.x + p1.x + p2.x) / 3.0;
    let cy = (p0.y + p1.y + p2.y) / 3.0;
    let cz = (p0.z + p1.z + p2.z) / 3.0;
    let d = -(a * cx + b * cy + c * cz);

    Some(Quadric::from_plane(a, b, c, d))
}

/// Determine the collapse target for an edge with summed quadric `q` and
/// endpoints `v1`, `v2`: the optimal point when the system is solvable,
/// otherwise the best of the endpoints and their midpoint. Returns the target
/// and its error.
pub fn collapse_target(
    q: &Quadric,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
) -> (Point3<f64>, f64) {
    if let Some(target) = q.optimal_point() {
        let error = q.evaluate(&target);
        return (target, error);
    }

    let midpoint = Point3::new(
        (v1.x + v2.x) / 2.0,
        (v1.y + v2.y) / 2.0,
        (v1.z + v2.z) / 2.0,
    );
    let v1_error = q.evaluate(v1);
    let v2_error = q.evaluate(v2);
    let midpoint_error = q.evaluate(&midpoint);

    let target = if v1_error < v2_error {
        if v1_error < midpoint_error {
            *v1
        } else {
            midpoint
        }
    } else if v2_error < midpoint_error {
        *v2
    } else {
        midpoint
    };

    (target, q.evaluate(&target))
}
