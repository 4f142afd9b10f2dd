//! Local-filesystem media storage. Uploaded binaries live under an
//! `uploads/` tree below the configured root, split by media kind; records
//! store the leading-slash URL form (`/uploads/audio/<name>`), which also
//! doubles as the public static-serving path.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::fs;
use uuid::Uuid;

/// Upload destinations, one subfolder each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Thumbnail,
}

impl MediaKind {
    pub fn subdir(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Thumbnail => "thumbnail",
        }
    }

    /// Map a multipart field name to its destination.
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "audio" => Some(MediaKind::Audio),
            "video" => Some(MediaKind::Video),
            "image" => Some(MediaKind::Thumbnail),
            _ => None,
        }
    }
}

/// Extensions accepted for podcast media. The extension is trusted over the
/// reported mime type, which is often application/octet-stream in practice.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "jpeg", "jpg", "png", "gif", "mp3", "wav", "m4a", "aac", "flac", "ogg", "webm", "mp4", "mkv",
    "avi", "mpeg", "mov",
];

/// Extensions accepted for profile pictures.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub fn extension_allowed(filename: &str, allowed: &[&str]) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            allowed.iter().any(|a| *a == e)
        })
        .unwrap_or(false)
}

fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin")
        .to_ascii_lowercase()
}

async fn store(
    root: &Path,
    subdir: Option<&str>,
    prefix: &str,
    original_name: &str,
    data: &[u8],
) -> anyhow::Result<String> {
    let mut dir = root.join("uploads");
    if let Some(sub) = subdir {
        dir = dir.join(sub);
    }
    fs::create_dir_all(&dir).await.context("create upload dir")?;

    let filename = format!(
        "{prefix}-{}.{}",
        Uuid::new_v4().simple(),
        extension_of(original_name)
    );
    fs::write(dir.join(&filename), data)
        .await
        .context("write upload")?;

    Ok(match subdir {
        Some(sub) => format!("/uploads/{sub}/{filename}"),
        None => format!("/uploads/{filename}"),
    })
}

/// Store a podcast media file and return its stored URL path.
pub async fn store_media(
    root: &Path,
    kind: MediaKind,
    original_name: &str,
    data: &[u8],
) -> anyhow::Result<String> {
    store(root, Some(kind.subdir()), kind.subdir(), original_name, data).await
}

/// Store a profile picture at the uploads root and return its URL path.
pub async fn store_profile_image(
    root: &Path,
    original_name: &str,
    data: &[u8],
) -> anyhow::Result<String> {
    store(root, None, "image", original_name, data).await
}

/// True when a stored path points into the application-managed uploads area
/// rather than at an external URL.
pub fn is_managed(stored: &str) -> bool {
    stored.starts_with("/uploads")
}

/// Resolve a stored `/uploads/...` path to a filesystem path under `root`.
/// Back-slash separators written by other host platforms are tolerated and
/// the leading slash is stripped before joining.
pub fn resolve(root: &Path, stored: &str) -> PathBuf {
    let normalized = stored.replace('\\', "/");
    let relative = normalized.strip_prefix('/').unwrap_or(&normalized);
    root.join(relative)
}

/// Remove a stored file. Returns `Ok(true)` when a file was deleted and
/// `Ok(false)` when it was already gone; a vanished file is never an error.
pub async fn remove_stored(root: &Path, stored: &str) -> anyhow::Result<bool> {
    let path = resolve(root, stored);
    match fs::remove_file(&path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("podhub-test-{}", Uuid::new_v4().simple()))
    }

    #[test]
    fn resolve_strips_leading_slash_and_joins() {
        let root = Path::new("/srv/podhub");
        assert_eq!(
            resolve(root, "/uploads/thumbnail/t.png"),
            Path::new("/srv/podhub/uploads/thumbnail/t.png")
        );
    }

    #[test]
    fn resolve_tolerates_backslash_separators() {
        let root = Path::new("/srv/podhub");
        assert_eq!(
            resolve(root, "\\uploads\\audio\\a.mp3"),
            Path::new("/srv/podhub/uploads/audio/a.mp3")
        );
    }

    #[test]
    fn managed_paths_are_recognized() {
        assert!(is_managed("/uploads/pp.png"));
        assert!(!is_managed("https://cdn.example.com/pp.png"));
        assert!(!is_managed(""));
    }

    #[test]
    fn extension_checks_are_case_insensitive() {
        assert!(extension_allowed("Episode.MP3", MEDIA_EXTENSIONS));
        assert!(extension_allowed("cover.PNG", IMAGE_EXTENSIONS));
        assert!(!extension_allowed("payload.exe", MEDIA_EXTENSIONS));
        assert!(!extension_allowed("noext", IMAGE_EXTENSIONS));
    }

    #[tokio::test]
    async fn store_media_writes_under_kind_subdir() {
        let root = temp_root();
        let stored = store_media(&root, MediaKind::Audio, "take1.mp3", b"riff")
            .await
            .expect("store");
        assert!(stored.starts_with("/uploads/audio/audio-"));
        assert!(stored.ends_with(".mp3"));
        assert!(resolve(&root, &stored).exists());
        fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn remove_stored_deletes_then_skips_missing() {
        let root = temp_root();
        fs::create_dir_all(root.join("uploads/thumbnail"))
            .await
            .unwrap();
        fs::write(root.join("uploads/thumbnail/t.png"), b"png")
            .await
            .unwrap();

        assert!(remove_stored(&root, "/uploads/thumbnail/t.png").await.unwrap());
        // second pass: already gone, idempotent skip
        assert!(!remove_stored(&root, "/uploads/thumbnail/t.png").await.unwrap());
        fs::remove_dir_all(&root).await.unwrap();
    }
}
