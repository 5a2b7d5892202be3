use std::{
    path::{Component, Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use reqwest::Client;
use tokio::fs;
use tracing::{info, warn};

use crate::error::Result;

const TITLE_LIMIT: usize = 50;
const DEFAULT_EXTENSION: &str = "jpg";
const NOTES_DIR: &str = "notes";

static UNSAFE_TITLE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/?%*:"|<>]|^\."#).expect("valid title regex"));
static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp)").expect("valid extension regex")
});

/// Directory the `notes/` folder is created in.
pub fn get_notes_root() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("/tmp"))
}

/// Title usable as a single file name: path separators, shell-hostile
/// characters and a leading dot become `-`.
pub fn safe_title(title: &str) -> String {
    UNSAFE_TITLE_CHARS
        .replace_all(title, "-")
        .chars()
        .take(TITLE_LIMIT)
        .collect()
}

/// First image extension mentioned anywhere in the URL, keeping its case.
pub fn image_extension(url: &str) -> &str {
    IMAGE_EXTENSION
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map_or(DEFAULT_EXTENSION, |m| m.as_str())
}

/// `notes/<safe-title>_image_<n>.<ext>`, `n` starting at 1.
pub fn image_filename(title: &str, position: usize, url: &str) -> PathBuf {
    Path::new(NOTES_DIR).join(format!(
        "{}_image_{}.{}",
        safe_title(title),
        position,
        image_extension(url)
    ))
}

async fn save_image(client: &Client, url: &str, dest: &Path) -> Result<()> {
    let bytes = client.get(url).send().await?.error_for_status()?.bytes().await?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(dest, &bytes).await?;
    Ok(())
}

/// True when `path` is a plain file name directly inside `dir`.
fn directly_inside(dir: &Path, path: &Path) -> bool {
    let Ok(rest) = path.strip_prefix(dir) else {
        return false;
    };
    let mut components = rest.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Save every image under `root`. A failed file is logged and skipped.
pub async fn download_images(
    client: &Client,
    urls: &[String],
    title: &str,
    root: &Path,
) -> Vec<PathBuf> {
    let notes_dir = root.join(NOTES_DIR);
    let mut saved = Vec::with_capacity(urls.len());
    for (i, url) in urls.iter().enumerate() {
        let dest = root.join(image_filename(title, i + 1, url));
        if !directly_inside(&notes_dir, &dest) {
            warn!(%url, path = %dest.display(), "image path leaves the notes folder, skipping");
            continue;
        }
        info!(%url, path = %dest.display(), "downloading image");
        match save_image(client, url, &dest).await {
            Ok(()) => saved.push(dest),
            Err(e) => warn!(%url, error = %e, "failed to download image"),
        }
    }
    saved
}
