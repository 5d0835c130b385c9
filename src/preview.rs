//! Cache of rendered preview frames.
//!
//! Entries are keyed by the measured layout and device pixel ratio, and
//! tagged with the session version they were rendered at. Any change to the
//! session bumps the version, which makes every older entry stale.

use std::collections::HashMap;

use log::debug;
use resvg::tiny_skia::Pixmap;

use crate::composition::{PreviewLayout, SizeF};

/// Identifies one measured layout at one pixel ratio.
///
/// Floats are compared by bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewKey {
    container: [u32; 2],
    displayed_image: Option<[u32; 2]>,
    dpr_bits: u32,
}

impl PreviewKey {
    pub fn new(layout: &PreviewLayout, dpr: f32) -> Self {
        let bits = |size: SizeF| [size.width.to_bits(), size.height.to_bits()];
        Self {
            container: bits(layout.container),
            displayed_image: layout.displayed_image.map(bits),
            dpr_bits: dpr.to_bits(),
        }
    }
}

/// Rendered frames for the current session version.
#[derive(Debug, Default)]
pub struct PreviewCache {
    entries: HashMap<PreviewKey, (Pixmap, u64)>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the frame for `key` if it was rendered at `version`.
    pub fn get_cached(&self, key: PreviewKey, version: u64) -> Option<&Pixmap> {
        let hit = self
            .entries
            .get(&key)
            .and_then(|(pixmap, stored)| (*stored == version).then_some(pixmap));
        if hit.is_some() {
            debug!("preview cache hit at version {version}");
        }
        hit
    }

    /// Stores a frame, dropping entries from other versions.
    pub fn store(&mut self, key: PreviewKey, pixmap: Pixmap, version: u64) {
        self.entries.retain(|_, (_, stored)| *stored == version);
        self.entries.insert(key, (pixmap, version));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
