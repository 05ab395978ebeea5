//! Saving narration audio to disk.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};

use crate::api::types::Story;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
  #[error("story has no narration")]
  NoAudio,
  #[error("narration is not valid base64: {0}")]
  Decode(#[from] base64::DecodeError),
  #[error("failed to write {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
}

/// Directory narration files are saved to.
pub fn default_dir() -> PathBuf {
  dirs::download_dir()
    .or_else(dirs::home_dir)
    .unwrap_or_else(|| PathBuf::from("."))
}

/// File name for a story's narration, e.g. `kucuk-sincap-s1.mp3`.
pub fn file_name(story: &Story) -> String {
  let mut slug = String::new();
  for c in story.title.chars().flat_map(char::to_lowercase) {
    let c = match c {
      'ç' => 'c',
      'ğ' => 'g',
      'ı' => 'i',
      'ö' => 'o',
      'ş' => 's',
      'ü' => 'u',
      c => c,
    };
    if c.is_ascii_alphanumeric() {
      slug.push(c);
    } else if !slug.is_empty() && !slug.ends_with('-') {
      slug.push('-');
    }
  }
  let slug = slug.trim_end_matches('-');
  if slug.is_empty() {
    format!("masal-{}.mp3", story.id)
  } else {
    format!("{}-{}.mp3", slug, story.id)
  }
}

pub fn decode_audio(story: &Story) -> Result<Vec<u8>, DownloadError> {
  let encoded = story
    .audio_base64
    .as_deref()
    .filter(|a| !a.is_empty())
    .ok_or(DownloadError::NoAudio)?;
  Ok(STANDARD.decode(encoded.trim())?)
}

/// Decode and write the narration into `dir`, returning the file path.
pub fn save_audio(story: &Story, dir: &Path) -> Result<PathBuf, DownloadError> {
  let bytes = decode_audio(story)?;
  let path = dir.join(file_name(story));
  std::fs::create_dir_all(dir).map_err(|source| DownloadError::Io {
    path: dir.to_path_buf(),
    source,
  })?;
  std::fs::write(&path, bytes).map_err(|source| DownloadError::Io {
    path: path.clone(),
    source,
  })?;
  tracing::info!(path = %path.display(), "saved narration");
  Ok(path)
}
