// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

use super::{segments_within, BoundingBox, RoadSource};
use crate::builder::{RoadSegment, ROAD_CLASSES};
use crate::{Error, Point, Result};

mod model;
mod xml;

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

impl FileFormat {
    /// Guesses the format from the file extension, defaulting to [FileFormat::Xml].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("gz") => Self::XmlGz,
            Some("bz2") => Self::XmlBz2,
            _ => Self::Xml,
        }
    }
}

/// [RoadSource] backed by a local OSM extract.
///
/// All ways with a `highway` tag from the [road class table](ROAD_CLASSES)
/// (including their `_link` variants) are loaded into memory once;
/// requests return the segments touching the requested bounding box.
#[derive(Debug, Clone, Default)]
pub struct OsmFileSource {
    segments: Vec<RoadSegment>,
}

impl OsmFileSource {
    /// Loads road segments from a file at the provided path, guessing its
    /// [format](FileFormat::from_path). Parsing runs on a blocking thread.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = FileFormat::from_path(&path);
        tokio::task::spawn_blocking(move || Self::from_file(path, format))
            .await
            .map_err(|e| Error::ExternalDataUnavailable(e.to_string()))?
    }

    /// Loads road segments from a file at the provided path.
    pub fn from_file<P: AsRef<Path>>(path: P, format: FileFormat) -> Result<Self> {
        let f = File::open(path)?;
        Self::from_io(f, format)
    }

    /// Loads road segments from a stream. The stream will be automatically wrapped
    /// in a buffered reader and a decompressor when needed.
    pub fn from_io<R: io::Read>(reader: R, format: FileFormat) -> Result<Self> {
        match format {
            FileFormat::Xml => {
                let b = io::BufReader::new(reader);
                Self::from_features(xml::Reader::from_io(b))
            }

            FileFormat::XmlGz => {
                let d = flate2::read::MultiGzDecoder::new(reader);
                let b = io::BufReader::new(d);
                Self::from_features(xml::Reader::from_io(b))
            }

            FileFormat::XmlBz2 => {
                let d = bzip2::read::MultiBzDecoder::new(reader);
                let b = io::BufReader::new(d);
                Self::from_features(xml::Reader::from_io(b))
            }
        }
    }

    /// Loads road segments from an in-memory, uncompressed OSM XML document.
    pub fn from_buffer(data: &[u8]) -> Result<Self> {
        Self::from_features(xml::Reader::from_buffer(data))
    }

    fn from_features<I>(features: I) -> Result<Self>
    where
        I: Iterator<Item = std::result::Result<model::Feature, quick_xml::Error>>,
    {
        let mut nodes: HashMap<i64, Point> = HashMap::default();
        let mut segments = Vec::default();

        for f in features {
            match f? {
                model::Feature::Node(n) => {
                    nodes.insert(n.id, n.position);
                }
                model::Feature::Way(w) => {
                    if let Some(segment) = way_to_segment(&w, &nodes) {
                        segments.push(segment);
                    }
                }
            }
        }

        log::debug!("loaded {} road segments from OSM data", segments.len());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[RoadSegment] {
        &self.segments
    }
}

fn is_road(highway: &str) -> bool {
    let base = highway.strip_suffix("_link").unwrap_or(highway);
    ROAD_CLASSES.iter().any(|c| c.name == base)
}

/// Converts a way into a [RoadSegment], provided it's a road. References to unknown
/// nodes (e.g. outside of the extract) are dropped.
fn way_to_segment(way: &model::Way, nodes: &HashMap<i64, Point>) -> Option<RoadSegment> {
    let highway = way.tags.get("highway").filter(|h| is_road(h))?;

    let points: Vec<Point> = way
        .nodes
        .iter()
        .filter_map(|id| nodes.get(id).copied())
        .collect();

    if points.len() < way.nodes.len() {
        log::debug!(
            "way {} references {} unknown nodes",
            way.id,
            way.nodes.len() - points.len()
        );
    }

    if points.len() >= 2 {
        Some(RoadSegment::new(highway, points))
    } else {
        None
    }
}

impl RoadSource for OsmFileSource {
    async fn fetch_road_segments(&self, bbox: &BoundingBox) -> Result<Vec<RoadSegment>> {
        Ok(segments_within(&self.segments, bbox))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const FIXTURE: &[u8] = include_bytes!("../test_fixtures/eixo.osm");

    fn check(source: &OsmFileSource) {
        let classes: Vec<&str> = source.segments().iter().map(|s| s.road_class.as_str()).collect();
        assert_eq!(classes, vec!["primary", "residential", "primary_link", "service"]);

        let primary = &source.segments()[0];
        assert_eq!(primary.points.len(), 4);
        assert_eq!(primary.points[0], Point::new(-15.7990, -47.8990));
        assert_eq!(primary.points[3], Point::new(-15.7870, -47.8870));

        // Reference to the missing node 999 is dropped
        assert_eq!(source.segments()[3].points.len(), 2);
    }

    #[test]
    fn format_from_path() {
        assert_eq!(FileFormat::from_path("df.osm"), FileFormat::Xml);
        assert_eq!(FileFormat::from_path("df.osm.gz"), FileFormat::XmlGz);
        assert_eq!(FileFormat::from_path("df.osm.bz2"), FileFormat::XmlBz2);
        assert_eq!(FileFormat::from_path("df"), FileFormat::Xml);
    }

    #[test]
    fn load_from_buffer() -> Result<()> {
        check(&OsmFileSource::from_buffer(FIXTURE)?);
        Ok(())
    }

    #[test]
    fn load_gz() -> Result<()> {
        let mut e = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        e.write_all(FIXTURE)?;
        let compressed = e.finish()?;

        check(&OsmFileSource::from_io(io::Cursor::new(compressed), FileFormat::XmlGz)?);
        Ok(())
    }

    #[test]
    fn load_bz2() -> Result<()> {
        let mut e = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        e.write_all(FIXTURE)?;
        let compressed = e.finish()?;

        check(&OsmFileSource::from_io(io::Cursor::new(compressed), FileFormat::XmlBz2)?);
        Ok(())
    }

    #[tokio::test]
    async fn open_file_and_fetch() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("eixo.osm");
        std::fs::write(&path, FIXTURE)?;

        let source = OsmFileSource::open(&path).await?;
        check(&source);

        let all = BoundingBox::around(Point::new(-15.80, -47.90), Point::new(-15.78, -47.87), 0.0);
        assert_eq!(source.fetch_road_segments(&all).await?.len(), 4);

        let corner = BoundingBox::around(Point::new(-15.784, -47.876), Point::new(-15.782, -47.874), 0.0);
        let near_8 = source.fetch_road_segments(&corner).await?;
        assert_eq!(near_8.len(), 1);
        assert_eq!(near_8[0].road_class, "service");
        Ok(())
    }

    #[tokio::test]
    async fn open_missing_file() {
        assert!(matches!(
            OsmFileSource::open("/nonexistent/roads.osm").await,
            Err(Error::Io(_))
        ));
    }
}
