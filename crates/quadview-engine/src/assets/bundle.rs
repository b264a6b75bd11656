use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::{SetupError, SetupResult};

/// Asset bytes together with the name and scale they were resolved for.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub name: String,
    pub scale: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
enum Source {
    Directory(PathBuf),
    Memory(HashMap<String, Vec<u8>>),
}

/// Lookup table for named assets.
#[derive(Debug, Clone)]
pub struct AssetBundle {
    source: Source,
}

impl AssetBundle {
    /// Resolves names relative to `root`.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Directory(root.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            source: Source::Memory(HashMap::new()),
        }
    }

    /// Adds an in-memory asset. Ignored for directory bundles.
    pub fn with_asset(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        match &mut self.source {
            Source::Memory(map) => {
                map.insert(name.into(), bytes);
            }
            Source::Directory(root) => {
                log::warn!("with_asset ignored for directory bundle at {}", root.display());
            }
        }
        self
    }

    /// Reads `name`, preferring the variant matching `scale_factor`.
    pub fn resolve(&self, name: &str, scale_factor: f64) -> SetupResult<ResolvedAsset> {
        let candidates = candidate_names(name, scale_factor);

        for (candidate, scale) in &candidates {
            if let Some(bytes) = self.read(candidate)? {
                log::debug!("asset `{name}` resolved to `{candidate}` (@{scale}x)");
                return Ok(ResolvedAsset {
                    name: candidate.clone(),
                    scale: *scale,
                    bytes,
                });
            }
        }

        Err(SetupError::AssetNotFound {
            name: name.to_string(),
            tried: candidates.into_iter().map(|(c, _)| c).collect(),
        })
    }

    fn read(&self, name: &str) -> SetupResult<Option<Vec<u8>>> {
        match &self.source {
            Source::Memory(map) => Ok(map.get(name).cloned()),
            Source::Directory(root) => match std::fs::read(root.join(name)) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(source) => Err(SetupError::AssetRead {
                    name: name.to_string(),
                    source,
                }),
            },
        }
    }
}

/// Names to try for `name` at `scale_factor`, most specific first.
fn candidate_names(name: &str, scale_factor: f64) -> Vec<(String, u32)> {
    let scale = if scale_factor.is_finite() {
        scale_factor.round().max(1.0) as u32
    } else {
        1
    };

    let mut out = Vec::with_capacity(2);
    if scale >= 2 {
        let variant = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => {
                format!("{stem}@{scale}x.{ext}")
            }
            _ => format!("{name}@{scale}x"),
        };
        out.push((variant, scale));
    }
    out.push((name.to_string(), 1));
    out
}
