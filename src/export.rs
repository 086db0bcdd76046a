//! Writes finished layouts to disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::layout::{Cell, Element, Port};
use crate::Result;

/// A flattened, hierarchy-free view of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatLayout {
    pub name: String,
    pub ports: Vec<Port>,
    pub elements: Vec<Element>,
}

impl FlatLayout {
    pub fn new(cell: &Cell) -> Self {
        Self {
            name: cell.name().to_string(),
            ports: cell.ports().cloned().collect(),
            elements: cell.flatten(),
        }
    }
}

/// Converts a finished cell into an on-disk mask format.
pub trait Serializer {
    fn write(&self, cell: &Cell, out: &mut dyn Write) -> Result<()>;

    fn write_to_file(&self, cell: &Cell, path: impl AsRef<Path>) -> Result<()>
    where
        Self: Sized,
    {
        let mut out = BufWriter::new(File::create(path)?);
        self.write(cell, &mut out)?;
        out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct JsonSerializer {
    pub pretty: bool,
}

impl Serializer for JsonSerializer {
    fn write(&self, cell: &Cell, out: &mut dyn Write) -> Result<()> {
        let layout = FlatLayout::new(cell);
        log::debug!(
            "writing {} with {} ports and {} elements",
            layout.name,
            layout.ports.len(),
            layout.elements.len()
        );
        if self.pretty {
            serde_json::to_writer_pretty(out, &layout)?;
        } else {
            serde_json::to_writer(out, &layout)?;
        }
        Ok(())
    }
}
