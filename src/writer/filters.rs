//! Stream filters applied before data is written.

use crate::error::{Error, Result};
use crate::object::Object;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// An encoding filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// zlib/deflate (`/FlateDecode`)
    Flate,
}

impl Filter {
    /// Decode filter name written in the stream dictionary.
    pub fn pdf_name(self) -> &'static str {
        match self {
            Filter::Flate => "FlateDecode",
        }
    }
}

/// Encode `data` through each filter in order.
pub fn encode(data: &[u8], filters: &[Filter]) -> Result<Vec<u8>> {
    let mut out = data.to_vec();
    for filter in filters {
        out = match filter {
            Filter::Flate => deflate(&out)?,
        };
    }
    Ok(out)
}

/// The `/Filter` value for an encoding chain, outermost decode first.
pub fn filter_entry(filters: &[Filter]) -> Option<Object> {
    match filters {
        [] => None,
        [single] => Some(Object::Name(single.pdf_name().to_string())),
        many => Some(Object::Array(
            many.iter()
                .rev()
                .map(|f| Object::Name(f.pdf_name().to_string()))
                .collect(),
        )),
    }
}

/// Decode stream data given its `/Filter` entry.
///
/// Only Flate is understood; any other filter is an error so undecodable
/// content is never copied into a page as if it were plain operators.
pub fn decode(data: &[u8], filter: Option<&Object>) -> Result<Vec<u8>> {
    let names: Vec<&str> = match filter {
        None => Vec::new(),
        Some(Object::Name(name)) => vec![name.as_str()],
        Some(Object::Array(items)) => items.iter().filter_map(|o| o.as_name()).collect(),
        Some(other) => {
            return Err(Error::InvalidPdf(format!("bad /Filter entry: {}", other.type_name())))
        },
    };
    let mut out = data.to_vec();
    for name in names {
        out = match name {
            "FlateDecode" | "Fl" => inflate(&out)?,
            other => return Err(Error::InvalidPdf(format!("unsupported filter /{}", other))),
        };
    }
    Ok(out)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::InvalidPdf(format!("corrupt Flate stream: {}", e)))?;
    Ok(out)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder
        .finish()
        .map_err(|e| Error::SerializationFault(format!("deflate failed: {}", e)))
}
