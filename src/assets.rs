use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

const TEMPLATES_SEGMENT: &str = "/templates/all/";
const CACHE_SEGMENT: &str = "/cache/";
const PUBLIC_ASSET_PREFIX: &str = "/converted_assets/";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Bare filenames are only meaningful relative to a template folder.
    #[error("no template context for bare filename")]
    NoTemplateContext,
    /// External URLs and unrecognized schemes are not migrated.
    #[error("unsupported source")]
    UnsupportedSource,
    #[error("source file not found: {0}")]
    NotFound(String),
}

/// Maps legacy image references onto the flat `converted_assets` store.
///
/// Resolution is a pure classification followed by an existence check and a
/// copy that is deduplicated by destination filename (content is assumed
/// identical when the name matches). Re-running the migration performs no
/// second copy and never corrupts an existing asset.
pub struct AssetResolver {
    templates_base: PathBuf,
    cache_base: PathBuf,
    web_root: PathBuf,
    dest_dir: PathBuf,
}

impl AssetResolver {
    /// Standard workspace layout: `templates/all`, `cache` and the
    /// destination store all live under one root directory.
    pub fn new(root: &Path) -> AssetResolver {
        AssetResolver {
            templates_base: root.join("templates").join("all"),
            cache_base: root.join("cache"),
            web_root: root.to_path_buf(),
            dest_dir: root.join("converted_assets"),
        }
    }

    /// Resolves a legacy source reference to a public asset path, copying
    /// the underlying file into the destination store.
    ///
    /// When the dedup copy itself fails the originally-classified public
    /// path is returned instead of an error. That path may not be served
    /// by the new system; losing the fidelity beats losing the image
    /// reference entirely, and the original migration behaved the same way.
    pub fn resolve(&self, src: &str, template_id: Option<&str>) -> Result<String, ResolveError> {
        let (source_path, public_path) = self.classify(src, template_id)?;
        if !source_path.is_file() {
            return Err(ResolveError::NotFound(
                source_path.to_string_lossy().into_owned(),
            ));
        }

        match self.copy_dedup(&source_path, template_id) {
            Ok(public) => Ok(public),
            Err(e) => {
                warn!(
                    source = %source_path.to_string_lossy(),
                    error = %e,
                    "asset copy failed; falling back to original public path"
                );
                Ok(public_path)
            }
        }
    }

    /// Classifies a source reference into one of the four supported
    /// categories, in priority order. Returns the candidate filesystem
    /// location and the public path the reference would keep if the copy
    /// step cannot run.
    fn classify(
        &self,
        src: &str,
        template_id: Option<&str>,
    ) -> Result<(PathBuf, String), ResolveError> {
        if let Some(pos) = src.find(TEMPLATES_SEGMENT) {
            let suffix = &src[pos + TEMPLATES_SEGMENT.len()..];
            return Ok((
                self.templates_base.join(suffix),
                format!("{}{}", TEMPLATES_SEGMENT, suffix),
            ));
        }

        if let Some(pos) = src.find(CACHE_SEGMENT) {
            let suffix = &src[pos + CACHE_SEGMENT.len()..];
            return Ok((
                self.cache_base.join(suffix),
                format!("{}{}", CACHE_SEGMENT, suffix),
            ));
        }

        if src.starts_with("http") || src.contains("://") {
            return Err(ResolveError::UnsupportedSource);
        }

        if !src.starts_with('/') {
            // Bare filename: assume it belongs to the template's own folder.
            let Some(tid) = template_id else {
                return Err(ResolveError::NoTemplateContext);
            };
            return Ok((
                self.templates_base.join(tid).join(src),
                format!("{}{}/{}", TEMPLATES_SEGMENT, tid, src),
            ));
        }

        // Already rooted relative to the web root.
        Ok((self.web_root.join(&src[1..]), src.to_string()))
    }

    fn copy_dedup(&self, source: &Path, template_id: Option<&str>) -> anyhow::Result<String> {
        std::fs::create_dir_all(&self.dest_dir).with_context(|| {
            format!(
                "failed to create asset store {}",
                self.dest_dir.to_string_lossy()
            )
        })?;

        let file_name = source
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow::anyhow!("source path has no filename"))?;
        let dest_name = match template_id {
            Some(tid) => format!("{}_{}", tid, file_name),
            None => file_name.to_string(),
        };
        let dest = self.dest_dir.join(&dest_name);

        if dest.is_file() {
            debug!(asset = %dest_name, "asset already in store, skipping copy");
        } else {
            std::fs::copy(source, &dest).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    source.to_string_lossy(),
                    dest.to_string_lossy()
                )
            })?;
            debug!(source = %source.to_string_lossy(), asset = %dest_name, "copied asset");
        }

        Ok(format!("{}{}", PUBLIC_ASSET_PREFIX, dest_name))
    }
}
