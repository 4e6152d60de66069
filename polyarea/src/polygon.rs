//! Polygon model and the `x,y` text format it is loaded from.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::InputError;
use crate::geometry::{point_in_polygon, Point};

/// Minimum number of vertices of a polygon.
pub const MIN_VERTICES: usize = 3;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BoundingBox {
    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// A simple polygon, stored as a closed ring of at least three vertices.
///
/// The last vertex connects back to the first. A `Polygon` can only be built
/// through [`Polygon::new`] or the parsers, so it is never degenerate.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    /// Builds a polygon from its ring of vertices.
    ///
    /// # Errors
    ///
    /// - [`InputError::TooFewVertices`] for fewer than three vertices
    /// - [`InputError::InvalidParameter`] for a non-finite coordinate
    pub fn new(vertices: Vec<Point>) -> Result<Self, InputError> {
        if vertices.len() < MIN_VERTICES {
            return Err(InputError::TooFewVertices(vertices.len()));
        }
        if let Some(index) = vertices
            .iter()
            .position(|v| !v.x.is_finite() || !v.y.is_finite())
        {
            return Err(InputError::InvalidParameter {
                name: "vertex",
                value: format!("vertex {index} has a non-finite coordinate"),
            });
        }
        Ok(Self { vertices })
    }

    /// Parses one `x,y` vertex per line.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, InputError> {
        let mut vertices = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            vertices.push(parse_vertex(line).ok_or_else(|| InputError::Parse {
                line: index + 1,
                content: line.to_string(),
            })?);
        }

        Self::new(vertices)
    }

    /// Reads and parses a polygon file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let polygon = Self::parse(&text)?;
        debug!(
            path = %path.display(),
            vertices = polygon.vertex_count(),
            "loaded polygon"
        );
        Ok(polygon)
    }

    #[inline]
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Whether `p` is inside the polygon or on its boundary.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        point_in_polygon(&self.vertices, p)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let first = self.vertices[0];
        let init = BoundingBox {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };

        self.vertices[1..].iter().fold(init, |b, v| BoundingBox {
            min_x: b.min_x.min(v.x),
            max_x: b.max_x.max(v.x),
            min_y: b.min_y.min(v.y),
            max_y: b.max_y.max(v.y),
        })
    }
}

impl FromStr for Polygon {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_vertex(line: &str) -> Option<Point> {
    let (x, y) = line.split_once(',')?;
    let x: f64 = x.trim().parse().ok()?;
    let y: f64 = y.trim().parse().ok()?;
    (x.is_finite() && y.is_finite()).then_some(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    const SQUARE: &str = "-1,-1\n1,-1\n1,1\n-1,1\n";

    #[test]
    fn test_parse_square() {
        let polygon = Polygon::parse(SQUARE).unwrap();

        assert_eq!(polygon.vertex_count(), 4);
        assert_eq!(polygon.vertices()[2], Point::new(1.0, 1.0));
        assert!(polygon.contains(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_comments() {
        let text = "# unit triangle\n  0.0 , 0.0\n\n1.5,0\r\n0.25,  2\n";
        let polygon: Polygon = text.parse().unwrap();

        assert_eq!(polygon.vertex_count(), 3);
        assert_eq!(polygon.vertices()[1], Point::new(1.5, 0.0));
        assert_eq!(polygon.vertices()[2], Point::new(0.25, 2.0));
    }

    #[test]
    fn test_parse_rejects_malformed_line() {
        let err = Polygon::parse("0,0\n1;1\n2,0\n").unwrap_err();
        match err {
            InputError::Parse { line, content } => {
                assert_eq!(line, 2);
                assert_eq!(content, "1;1");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(matches!(
            Polygon::parse("0,0\n1,1,1\n2,0\n"),
            Err(InputError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            Polygon::parse("0,0\nnan,1\n2,0\n"),
            Err(InputError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_too_few_vertices() {
        assert!(matches!(
            Polygon::parse("0,0\n1,1\n"),
            Err(InputError::TooFewVertices(2))
        ));
        assert!(matches!(
            Polygon::parse(""),
            Err(InputError::TooFewVertices(0))
        ));
    }

    #[test]
    fn test_new_rejects_non_finite() {
        let vertices = vec![
            Point::new(0.0, 0.0),
            Point::new(f64::INFINITY, 0.0),
            Point::new(0.0, 1.0),
        ];
        assert!(matches!(
            Polygon::new(vertices),
            Err(InputError::InvalidParameter { name: "vertex", .. })
        ));
    }

    #[test]
    fn test_bounding_box() {
        let polygon = Polygon::parse("0,-2\n1.5,0\n0,1\n-0.5,0\n").unwrap();
        let bbox = polygon.bounding_box();

        assert_relative_eq!(bbox.min_x, -0.5);
        assert_relative_eq!(bbox.max_x, 1.5);
        assert_relative_eq!(bbox.min_y, -2.0);
        assert_relative_eq!(bbox.max_y, 1.0);
        assert_relative_eq!(bbox.area(), 6.0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SQUARE.as_bytes()).unwrap();

        let polygon = Polygon::load(file.path()).unwrap();
        assert_eq!(polygon.vertex_count(), 4);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Polygon::load(dir.path().join("missing.txt")).unwrap_err();

        assert!(matches!(err, InputError::Io { .. }));
        assert!(err.to_string().contains("missing.txt"));
    }
}
