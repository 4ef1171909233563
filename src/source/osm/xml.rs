// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::io;
use std::str::from_utf8;

use quick_xml::events::{BytesStart, Event};

use super::model::{Feature, Node, Way};
use crate::Point;

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
pub(super) trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
pub(super) struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
pub(super) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<Event<'b>> {
        self.0.read_event()
    }
}

/// Reader streams [Features](Feature) from an [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML) document.
pub(super) struct Reader<P: Parser> {
    parser: P,
    eof: bool,
}

impl<'a> Reader<BufParser<'a>> {
    #[inline]
    pub(super) fn from_buffer(data: &'a [u8]) -> Self {
        Self {
            parser: BufParser(quick_xml::Reader::from_reader(data)),
            eof: false,
        }
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    #[inline]
    pub(super) fn from_io(reader: R) -> Self {
        Self {
            parser: IoParser(quick_xml::Reader::from_reader(reader), Vec::default()),
            eof: false,
        }
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<Feature, quick_xml::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut f: Option<Feature> = None;

        while !self.eof {
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => return Some(Err(e)),
            };

            match event {
                Event::Empty(start) => match start.local_name().as_ref() {
                    b"node" => {
                        if let Some(n) = parse_node(&start) {
                            return Some(Ok(Feature::Node(n)));
                        }
                    }
                    b"tag" => {
                        if let Some(Feature::Way(ref mut w)) = f {
                            if let Some((k, v)) = parse_tag(&start) {
                                w.tags.insert(k, v);
                            }
                        }
                    }
                    b"nd" => {
                        if let Some(Feature::Way(ref mut w)) = f {
                            if let Some(ref_) = parse_nd(&start) {
                                w.nodes.push(ref_);
                            }
                        }
                    }
                    _ => {}
                },

                Event::Start(start) => match start.local_name().as_ref() {
                    b"node" => f = parse_node(&start).map(Feature::Node),
                    b"way" => f = parse_way(&start).map(Feature::Way),
                    // Relations (and their members and tags) are not needed for road geometry
                    b"relation" => f = None,
                    _ => {}
                },

                Event::End(end) => match end.local_name().as_ref() {
                    b"node" | b"way" => {
                        if let Some(f) = f.take() {
                            return Some(Ok(f));
                        }
                    }
                    _ => {}
                },

                Event::Eof => {
                    self.eof = true;
                }

                _ => {}
            }
        }

        return f.map(Ok);
    }
}

fn parse_id(value: &[u8]) -> Option<i64> {
    from_utf8(value).ok()?.parse().ok()
}

fn parse_coordinate(value: &[u8]) -> Option<f64> {
    from_utf8(value).ok()?.parse().ok()
}

fn parse_node(start: &BytesStart<'_>) -> Option<Node> {
    let mut id: i64 = 0;
    let mut lat = f64::NAN;
    let mut lon = f64::NAN;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"id" => id = parse_id(&attr.value)?,
            b"lat" => lat = parse_coordinate(&attr.value)?,
            b"lon" => lon = parse_coordinate(&attr.value)?,
            _ => {}
        }
    }

    let position = Point::new(lat, lon);
    if id != 0 && position.is_valid() {
        Some(Node { id, position })
    } else {
        log::debug!("skipping OSM node with invalid attributes (id {})", id);
        None
    }
}

fn parse_way(start: &BytesStart<'_>) -> Option<Way> {
    let mut id: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        if attr.key.as_ref() == b"id" {
            id = parse_id(&attr.value)?;
        }
    }

    if id != 0 {
        Some(Way {
            id,
            nodes: Vec::default(),
            tags: HashMap::default(),
        })
    } else {
        None
    }
}

fn parse_tag(start: &BytesStart<'_>) -> Option<(String, String)> {
    let mut k = None;
    let mut v = None;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"k" => k = attr.unescape_value().ok().map(|s| s.into_owned()),
            b"v" => v = attr.unescape_value().ok().map(|s| s.into_owned()),
            _ => {}
        }
    }

    k.map(|k| (k, v.unwrap_or_default()))
}

fn parse_nd(start: &BytesStart<'_>) -> Option<i64> {
    for attr in start.attributes() {
        let attr = attr.ok()?;
        if attr.key.as_ref() == b"ref" {
            return parse_id(&attr.value).filter(|&r| r != 0);
        }
    }
    None
}
