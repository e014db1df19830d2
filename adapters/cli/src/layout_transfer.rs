use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use pipeflow_core::{LevelDescriptor, MAX_GRID_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{Layout, PlacedPipe};

const SNAPSHOT_DOMAIN: &str = "pipe";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "pipe:v1";
/// Delimiter used to separate the prefix, grid size and payload.
const FIELD_DELIMITER: char = ':';

/// Self-contained snapshot of a level and the pipes laid on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LayoutSnapshot {
    /// Level the pipes are laid on.
    pub grid: LevelDescriptor,
    /// Pipes composing the layout.
    pub pipes: Vec<PlacedPipe>,
}

impl LayoutSnapshot {
    /// Encodes the snapshot into a single-line string suitable for sharing.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = SerializableSnapshot {
            start: self.grid.start,
            end: self.grid.end,
            pipes: self.pipes.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!("{SNAPSHOT_HEADER}:{}:{encoded}", self.grid.size))
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        // The payload is base64 and never contains the delimiter.
        let fields: Vec<&str> = trimmed.splitn(4, FIELD_DELIMITER).collect();
        match *fields.as_slice() {
            [SNAPSHOT_DOMAIN, SNAPSHOT_VERSION, size, payload] => {
                Self::from_fields(size, payload)
            }
            [SNAPSHOT_DOMAIN, SNAPSHOT_VERSION, _] => Err(LayoutTransferError::MissingPayload),
            [SNAPSHOT_DOMAIN, SNAPSHOT_VERSION] => Err(LayoutTransferError::MissingSize),
            [SNAPSHOT_DOMAIN, version, ..] => {
                Err(LayoutTransferError::UnsupportedVersion(version.to_owned()))
            }
            [SNAPSHOT_DOMAIN] => Err(LayoutTransferError::MissingVersion),
            [domain, ..] => Err(LayoutTransferError::InvalidPrefix(domain.to_owned())),
            [] => Err(LayoutTransferError::EmptyPayload),
        }
    }

    fn from_fields(size: &str, payload: &str) -> Result<Self, LayoutTransferError> {
        let size = parse_size(size)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        Ok(Self {
            grid: LevelDescriptor {
                size,
                start: decoded.start,
                end: decoded.end,
            },
            pipes: decoded.pipes,
        })
    }

    /// Converts the snapshot into a layout with an inline grid.
    #[must_use]
    pub(crate) fn into_layout(self) -> Layout {
        Layout {
            level: None,
            grid: Some(self.grid),
            pipes: self.pipes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct SerializableSnapshot {
    start: pipeflow_core::Endpoint,
    end: pipeflow_core::Endpoint,
    pipes: Vec<PlacedPipe>,
}

/// Errors that can occur while encoding or decoding layout share strings.
#[derive(Debug, Error)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("layout string was empty")]
    EmptyPayload,
    /// The encoded snapshot did not contain a version segment.
    #[error("layout string is missing the version")]
    MissingVersion,
    /// The encoded snapshot did not include the grid size.
    #[error("layout string is missing the grid size")]
    MissingSize,
    /// The encoded snapshot did not include the payload segment.
    #[error("layout string is missing the payload")]
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    #[error("layout prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    #[error("layout version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid size could not be parsed from the encoded snapshot.
    #[error("could not parse grid size '{0}'")]
    InvalidSize(String),
    /// The grid size exceeds what a level may hold.
    #[error("grid size {0} exceeds the maximum of {max}", max = MAX_GRID_SIZE)]
    OversizedGrid(u32),
    /// The base64 payload could not be decoded.
    #[error("could not decode layout payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    #[error("could not process layout payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

fn parse_size(size: &str) -> Result<u32, LayoutTransferError> {
    let parsed = size
        .trim()
        .parse::<u32>()
        .map_err(|_| LayoutTransferError::InvalidSize(size.to_owned()))?;

    if parsed == 0 {
        return Err(LayoutTransferError::InvalidSize(size.to_owned()));
    }
    if parsed > MAX_GRID_SIZE {
        return Err(LayoutTransferError::OversizedGrid(parsed));
    }

    Ok(parsed)
}
