use std::path::{Path, PathBuf};

use anyhow::Context;
use rand::seq::IndexedRandom;

use super::{ContentProvider, Puzzle};
use crate::error::ExitError;
use crate::event::Message;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png"];

/// Random picture from a directory tree; the file stem is the answer.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    dir: PathBuf,
}

impl LocalProvider {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every usable picture under the directory, in a stable order.
    pub fn pool(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        collect_images(&self.dir, &mut found)?;
        found.sort();
        Ok(found)
    }
}

fn collect_images(dir: &Path, found: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            collect_images(&path, found)?;
        } else if answer_for(&path).is_some() {
            found.push(path);
        }
    }
    Ok(())
}

/// `一帆风顺.png` -> `一帆风顺`. None for anything that isn't a named picture.
fn answer_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if !IMAGE_EXTENSIONS.contains(&ext) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?.trim();
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}

impl ContentProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn next(&self) -> anyhow::Result<Puzzle> {
        let pool = self
            .pool()
            .map_err(|e| ExitError::provider(self.name(), format!("{e:#}")))?;
        let path = pool.choose(&mut rand::rng()).ok_or_else(|| {
            ExitError::provider(self.name(), format!("{} is empty", self.dir.display()))
        })?;
        let answer = answer_for(path)
            .ok_or_else(|| ExitError::provider(self.name(), "picture name is empty"))?;
        tracing::debug!(path = %path.display(), "picked local puzzle");
        Ok(Puzzle {
            prompt: Message::new().with_image(path.display().to_string()),
            answer,
        })
    }
}
