use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use pipeflow_core::{CellCoord, LevelDescriptor, PieceShape, PipeDescriptor, Rotation};
use pipeflow_system_session::{Level, LevelCatalog};
use serde::{Deserialize, Serialize};

/// Identifier given to levels defined inline by a layout file.
pub(crate) const CUSTOM_LEVEL_ID: u32 = 0;

/// Pipes to lay on a level, read from a TOML file or a share string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Layout {
    /// Built-in level the pipes belong to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    /// Inline level, used instead of a built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<LevelDescriptor>,
    /// Pipes placed during setup, in order.
    #[serde(default)]
    pub pipes: Vec<PlacedPipe>,
}

/// One pipe of a layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PlacedPipe {
    /// Zero-based row of the cell.
    pub row: u32,
    /// Zero-based column of the cell.
    pub col: u32,
    /// Shape of the pipe.
    #[serde(rename = "type")]
    pub shape: PieceShape,
    /// Orientation in degrees.
    #[serde(default)]
    pub rotation: Rotation,
}

impl PlacedPipe {
    /// Cell the pipe is placed in.
    #[must_use]
    pub(crate) const fn cell(&self) -> CellCoord {
        CellCoord::new(self.row, self.col)
    }

    /// Piece placed into the cell.
    #[must_use]
    pub(crate) const fn piece(&self) -> PipeDescriptor {
        PipeDescriptor::new(self.shape, self.rotation)
    }
}

impl Layout {
    /// Reads a layout from a TOML file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read layout at {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("invalid layout in {}", path.display()))
    }

    /// Parses a layout from TOML text.
    pub(crate) fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse layout toml contents")
    }

    /// Renders the layout as TOML text.
    pub(crate) fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("failed to render layout as toml")
    }

    /// Resolves the level the layout is played on.
    pub(crate) fn resolve(&self, catalog: &LevelCatalog) -> Result<Level> {
        match (self.level, self.grid) {
            (Some(_), Some(_)) => bail!("layout names both a built-in level and an inline grid"),
            (None, None) => bail!("layout names neither a built-in level nor an inline grid"),
            (Some(id), None) => catalog
                .level(id)
                .copied()
                .with_context(|| format!("unknown level {id}")),
            (None, Some(grid)) => Ok(Level::new(CUSTOM_LEVEL_ID, grid)),
        }
    }
}
