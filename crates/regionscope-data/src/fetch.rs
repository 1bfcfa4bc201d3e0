use std::{
    fs,
    path::{Path, PathBuf},
};

use futures::{StreamExt, future::try_join_all};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};
use zip::ZipArchive;

use crate::{DataError, Result, boundary::BoundaryKind};

/// Where to download one boundary kind from. URLs ending in `.zip` are unpacked.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub kind: BoundaryKind,
    pub url: String,
}

impl DownloadTarget {
    /// `{base_url}/{file name}` for each kind.
    pub fn from_base_url(base_url: &str, kinds: &[BoundaryKind]) -> Vec<Self> {
        let base = base_url.trim_end_matches('/');
        kinds
            .iter()
            .map(|&kind| Self {
                kind,
                url: format!("{base}/{}", kind.file_name()),
            })
            .collect()
    }
}

/// Downloads every requested file concurrently into `dest`, one `<kind file name>` each.
#[instrument(name = "Download boundaries", skip_all, level = "info")]
pub fn download_boundaries(targets: &[DownloadTarget], dest: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dest)?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let client = Client::new();
        try_join_all(
            targets
                .iter()
                .map(|target| download_one(&client, target, dest)),
        )
        .await
    })
}

async fn download_one(client: &Client, source: &DownloadTarget, dest: &Path) -> Result<PathBuf> {
    let target = dest.join(source.kind.file_name());
    let downloaded = download_to_temp_file(client, &source.url).await?;

    if source.url.to_ascii_lowercase().ends_with(".zip") {
        let zip_path = downloaded.path().to_path_buf();
        let out = target.clone();
        tokio::task::spawn_blocking(move || extract_first_entry(&zip_path, &out)).await??;
    } else {
        fs::copy(downloaded.path(), &target)?;
    }

    info!(kind = %source.kind, path = %target.display(), "Boundary file ready");
    Ok(target)
}

async fn download_to_temp_file(client: &Client, url: &str) -> Result<NamedTempFile> {
    info!(url, "Starting download");
    let response = client.get(url).send().await?.error_for_status()?;

    let total_size = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("█░"));
    }
    pb.set_message(format!(
        "Downloading {}",
        url.split('/').next_back().unwrap_or(url)
    ));

    let temp_file = NamedTempFile::new()?;
    let mut dest_file = tokio::fs::File::create(temp_file.path()).await?;

    let mut stream = response.bytes_stream();
    while let Some(item) = stream.next().await {
        let chunk = item?;
        dest_file.write_all(&chunk).await?;
        pb.inc(chunk.len() as u64);
    }
    dest_file.flush().await?;
    pb.finish_and_clear();
    Ok(temp_file)
}

fn extract_first_entry(zip_path: &Path, target: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(fs::File::open(zip_path)?)?;
    if archive.is_empty() {
        return Err(DataError::ZipError(zip::result::ZipError::FileNotFound));
    }
    let mut entry = archive.by_index(0)?;
    let mut out = fs::File::create(target)?;
    std::io::copy(&mut entry, &mut out)?;
    info!(path = %target.display(), "Archive entry extracted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_from_base_url() {
        let targets = DownloadTarget::from_base_url(
            "https://example.org/maps/",
            &[BoundaryKind::Sa2, BoundaryKind::Postcode],
        );
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].url, "https://example.org/maps/SA2.geojson");
        assert_eq!(targets[1].url, "https://example.org/maps/POA.geojson");
    }
}
