use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::composite::CompositeThreading;
use crate::decode::DecodeOpts;
use crate::foundation::error::{PlayerError, PlayerResult};

/// Player configuration.
///
/// Every field is optional in JSON; missing fields take their defaults and unknown fields are
/// rejected.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerOpts {
    /// Start playing as soon as a load succeeds. When `false` the new animation is shown paused
    /// on frame 0.
    pub autoplay: bool,
    /// Fetch, decode and composite on a worker thread.
    pub background_decode: bool,
    /// Expand frame palettes on a rayon pool.
    pub parallel_expand: bool,
    /// Worker thread count for `parallel_expand`. `None` uses rayon's default.
    pub threads: Option<usize>,
    /// Refuse canvases or frames with more pixels than this.
    pub max_pixels: Option<u64>,
}

impl Default for PlayerOpts {
    fn default() -> Self {
        Self {
            autoplay: true,
            background_decode: true,
            parallel_expand: false,
            threads: None,
            max_pixels: DecodeOpts::default().max_pixels,
        }
    }
}

impl PlayerOpts {
    /// Parse options from a JSON string and validate them.
    pub fn from_json_str(json: &str) -> PlayerResult<Self> {
        let opts: Self = serde_json::from_str(json)
            .map_err(|e| PlayerError::config(format!("parse player options JSON: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Parse options from a JSON file on disk and validate them.
    pub fn from_path(path: impl AsRef<Path>) -> PlayerResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            PlayerError::config(format!("open player options '{}': {e}", path.display()))
        })?;
        let opts: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            PlayerError::config(format!("parse player options '{}': {e}", path.display()))
        })?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reject values that cannot be honored.
    pub fn validate(&self) -> PlayerResult<()> {
        if self.threads == Some(0) {
            return Err(PlayerError::config("'threads' must be >= 1 when set"));
        }
        if self.max_pixels == Some(0) {
            return Err(PlayerError::config("'max_pixels' must be >= 1 when set"));
        }
        Ok(())
    }

    /// Decoder limits derived from these options.
    pub fn decode_opts(&self) -> DecodeOpts {
        DecodeOpts {
            max_pixels: self.max_pixels,
        }
    }

    /// Compositor threading derived from these options.
    pub fn threading(&self) -> CompositeThreading {
        CompositeThreading {
            parallel: self.parallel_expand,
            threads: self.threads,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/load/opts.rs"]
mod tests;
