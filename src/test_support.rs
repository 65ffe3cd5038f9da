use geo::{polygon, MultiPolygon};

/// Unit square with its lower-left corner at `(x, y)`.
pub(crate) fn square(x: f64, y: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![
        (x: x, y: y),
        (x: x + 1.0, y: y),
        (x: x + 1.0, y: y + 1.0),
        (x: x, y: y + 1.0),
        (x: x, y: y),
    ]])
}
