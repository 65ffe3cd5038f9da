use geo::{Area, BooleanOps, MultiPolygon, Validation};

/// Union a set of shapes into one MultiPolygon. Returns `None` for an empty input.
/// This may be slow for large numbers of complex polygons.
pub fn dissolve<'a>(shapes: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> Option<MultiPolygon<f64>> {
    shapes.into_iter()
        .cloned()
        .reduce(|a, b| a.union(&b))
        .map(make_valid)
}

/// Coerce a MultiPolygon into valid topology by re-noding it through a boolean union.
pub fn make_valid(shape: MultiPolygon<f64>) -> MultiPolygon<f64> {
    if shape.is_valid() { return shape }
    shape.union(&MultiPolygon::new(vec![]))
}

/// `(base ∪ added) − removed`, used to update a district without rebuilding it.
pub fn patch<'a>(
    base: Option<&'a MultiPolygon<f64>>,
    added: impl IntoIterator<Item = &'a MultiPolygon<f64>>,
    removed: impl IntoIterator<Item = &'a MultiPolygon<f64>>,
) -> Option<MultiPolygon<f64>> {
    let grown = dissolve(base.into_iter().chain(added))?;
    let shrunk = removed.into_iter().fold(grown, |acc, shape| acc.difference(shape));
    (!shrunk.0.is_empty() && shrunk.unsigned_area() > 0.0).then(|| make_valid(shrunk))
}

/// Number of disjoint parts; a contiguous district has exactly one.
#[inline]
pub fn part_count(shape: &MultiPolygon<f64>) -> usize { shape.0.len() }
