use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;

use crate::error::ConvertError;
use crate::gpx_types::*;

type Result<T> = std::result::Result<T, ConvertError>;

/// Parse raw GPX file contents into GpxData.
pub fn parse_gpx(bytes: &[u8]) -> Result<GpxData> {
    let xml = std::str::from_utf8(bytes)
        .map_err(|e| ConvertError::malformed(format_args!("input is not valid UTF-8: {e}")))?;
    parse_gpx_str(xml)
}

/// Parse a GPX XML string into GpxData.
///
/// The root element's name is not checked. Only its direct `trk` and `wpt`
/// children are decoded; every other element is skipped whole. Parsing stops
/// once the root element closes.
pub fn parse_gpx_str(xml: &str) -> Result<GpxData> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let mut data = GpxData {
                    version: read_version(&e)?,
                    ..Default::default()
                };
                parse_root(&mut reader, &mut data)?;
                return Ok(data);
            }
            Event::Empty(e) => {
                return Ok(GpxData {
                    version: read_version(&e)?,
                    ..Default::default()
                });
            }
            Event::Eof => return Err(ConvertError::malformed("document has no root element")),
            _ => {}
        }
    }
}

fn read_version(e: &BytesStart<'_>) -> Result<Option<String>> {
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == b"version" {
            return Ok(Some(String::from_utf8_lossy(&attr.value).into_owned()));
        }
    }
    Ok(None)
}

fn parse_root<'a>(reader: &mut Reader<&'a [u8]>, data: &mut GpxData) -> Result<()> {
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trk" => data.tracks.push(parse_track(reader)?),
                b"wpt" => data.waypoints.push(parse_point(&e, reader)?),
                _ => skip_element(&e, reader)?,
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"trk" => data.tracks.push(GpxTrack::default()),
                b"wpt" => {
                    let (lat, lon) = parse_lat_lon(&e)?;
                    data.waypoints.push(GpxPoint::new(lat, lon));
                }
                _ => {}
            },
            Event::GeneralRef(e) => {
                resolve_entity(&e)?;
            }
            // quick-xml rejects mismatched end tags, so this one closes the root.
            Event::End(_) => return Ok(()),
            Event::Eof => return Err(unexpected_eof("gpx")),
            _ => {}
        }
    }
}

/// Parse a <trk> element.
fn parse_track<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxTrack> {
    let mut track = GpxTrack::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trkseg" => track.segments.push(parse_segment(reader)?),
                _ => skip_element(&e, reader)?,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkseg" {
                    track.segments.push(GpxSegment::default());
                }
            }
            Event::GeneralRef(e) => {
                resolve_entity(&e)?;
            }
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof("trk")),
            _ => {}
        }
    }

    Ok(track)
}

/// Parse a <trkseg> element.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxSegment> {
    let mut segment = GpxSegment::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trkpt" => segment.points.push(parse_point(&e, reader)?),
                _ => skip_element(&e, reader)?,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkpt" {
                    let (lat, lon) = parse_lat_lon(&e)?;
                    segment.points.push(GpxPoint::new(lat, lon));
                }
            }
            Event::GeneralRef(e) => {
                resolve_entity(&e)?;
            }
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof("trkseg")),
            _ => {}
        }
    }

    Ok(segment)
}

/// Parse a point element (wpt, trkpt) and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(start: &BytesStart<'a>, reader: &mut Reader<&'a [u8]>) -> Result<GpxPoint> {
    let (lat, lon) = parse_lat_lon(start)?;
    let mut point = GpxPoint::new(lat, lon);

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"time" => point.time = Some(read_text_owned(reader)?),
                // ele, name, extensions, ...
                _ => skip_element(&e, reader)?,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"time" {
                    point.time = Some(String::new());
                }
            }
            Event::GeneralRef(e) => {
                resolve_entity(&e)?;
            }
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof("trkpt")),
            _ => {}
        }
    }

    Ok(point)
}

/// Parse lat/lon attributes from a point element's start tag.
/// A missing or blank attribute reads as 0.
fn parse_lat_lon(e: &BytesStart<'_>) -> Result<(f64, f64)> {
    let mut lat = 0.0;
    let mut lon = 0.0;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(quick_xml::Error::from)?;
        match attr.key.local_name().as_ref() {
            b"lat" => lat = parse_coordinate(e, "lat", &attr.value)?,
            b"lon" => lon = parse_coordinate(e, "lon", &attr.value)?,
            _ => {}
        }
    }

    Ok((lat, lon))
}

fn parse_coordinate(e: &BytesStart<'_>, attribute: &str, raw: &[u8]) -> Result<f64> {
    let raw = String::from_utf8_lossy(raw);
    let text = quick_xml::escape::unescape(&raw).map_err(|err| {
        ConvertError::malformed(format_args!("attribute '{attribute}': {err}"))
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(0.0);
    }
    text.parse::<f64>().map_err(|err| {
        ConvertError::malformed(format_args!(
            "invalid value '{text}' for attribute '{attribute}' on <{}>: {err}",
            String::from_utf8_lossy(e.local_name().as_ref())
        ))
    })
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
/// Nested child elements are skipped.
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>) -> Result<String> {
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Text(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) => text.push(resolve_entity(&e)?),
            Event::Start(e) => skip_element(&e, reader)?,
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof("time")),
            _ => {}
        }
    }

    Ok(text)
}

fn skip_element<'a>(start: &BytesStart<'a>, reader: &mut Reader<&'a [u8]>) -> Result<()> {
    let mut depth = 1usize;

    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::GeneralRef(e) => {
                resolve_entity(&e)?;
            }
            Event::Eof => {
                return Err(unexpected_eof(&String::from_utf8_lossy(
                    start.local_name().as_ref(),
                )));
            }
            _ => {}
        }
    }
}

/// Character references and the five predefined entities. Anything else
/// leaves the document ill-formed.
fn resolve_entity(e: &BytesRef<'_>) -> Result<char> {
    if let Ok(Some(ch)) = e.resolve_char_ref() {
        return Ok(ch);
    }
    let name: &[u8] = e.as_ref();
    match name {
        b"amp" => Ok('&'),
        b"lt" => Ok('<'),
        b"gt" => Ok('>'),
        b"quot" => Ok('"'),
        b"apos" => Ok('\''),
        other => Err(ConvertError::malformed(format_args!(
            "unknown entity '&{};'",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn unexpected_eof(element: &str) -> ConvertError {
    ConvertError::malformed(format_args!("unexpected end of document inside <{element}>"))
}
