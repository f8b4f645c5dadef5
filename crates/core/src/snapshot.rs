//! Snapshot downloads: fetch every file of a model into a local directory,
//! skipping files that are already complete and resuming partial ones.

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::cancel::CancelToken;
use crate::error::{HubError, Result};
use crate::hub::{HubClient, RepoFile};

const PART_EXTENSION: &str = "part";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotReport {
    pub model_id: String,
    pub directory: PathBuf,
    pub downloaded: usize,
    pub skipped: usize,
    /// Bytes transferred by this run.
    pub bytes: u64,
}

/// Directory name for a model: path separators become `_`.
pub fn sanitize_model_id(model_id: &str) -> String {
    model_id.replace(['/', '\\'], "_")
}

/// `<root>/<sanitized model id>`
pub fn model_dir(root: &Path, model_id: &str) -> PathBuf {
    root.join(sanitize_model_id(model_id))
}

/// `<name>.part` next to the final file.
pub fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(PART_EXTENSION);
    path.with_file_name(name)
}

/// Resolve a repository path under `destination`, rejecting anything that
/// would escape it.
fn local_path(destination: &Path, repo_path: &str) -> Result<PathBuf> {
    let relative = Path::new(repo_path);
    let clean = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));

    if repo_path.is_empty() || !clean {
        return Err(HubError::InvalidPath(repo_path.to_string()));
    }
    Ok(destination.join(relative))
}

async fn file_len(path: &Path) -> Option<u64> {
    fs::metadata(path).await.ok().map(|m| m.len())
}

fn progress_bar(show: bool, total: Option<u64>, label: &str) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }

    let pb = match total {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::new_spinner(),
    };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(label.to_string());
    pb
}

/// Download every file of `model_id` into `destination`.
///
/// A file is skipped when it already exists with the size the hub reports
/// (or the hub reports no size). Partial files live beside their final name
/// with a `.part` suffix and are resumed on the next run. The cancellation
/// token is raced against every hub request and checked between chunks; on
/// cancellation the part file is left in place and [`HubError::Cancelled`]
/// is returned.
pub async fn download_snapshot(
    hub: &dyn HubClient,
    model_id: &str,
    destination: &Path,
    cancel: &CancelToken,
    show_progress: bool,
) -> Result<SnapshotReport> {
    fs::create_dir_all(destination).await?;

    let files = cancel.run_until_cancelled(hub.list_files(model_id)).await?;
    tracing::info!(
        model_id = %model_id,
        files = files.len(),
        destination = %destination.display(),
        "Starting snapshot download"
    );

    let mut report = SnapshotReport {
        model_id: model_id.to_string(),
        directory: destination.to_path_buf(),
        downloaded: 0,
        skipped: 0,
        bytes: 0,
    };

    for file in &files {
        if cancel.is_cancelled() {
            return Err(HubError::Cancelled);
        }

        let target = local_path(destination, &file.path)?;
        if is_complete(&target, file).await {
            tracing::debug!(file = %file.path, "Already present, skipping");
            report.skipped += 1;
            continue;
        }

        report.bytes += download_file(hub, model_id, file, &target, cancel, show_progress).await?;
        report.downloaded += 1;
    }

    tracing::info!(
        model_id = %model_id,
        downloaded = report.downloaded,
        skipped = report.skipped,
        bytes = report.bytes,
        "Snapshot complete"
    );
    Ok(report)
}

async fn is_complete(target: &Path, file: &RepoFile) -> bool {
    match (file_len(target).await, file.size) {
        (Some(len), Some(size)) => len == size,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

async fn download_file(
    hub: &dyn HubClient,
    model_id: &str,
    file: &RepoFile,
    target: &Path,
    cancel: &CancelToken,
    show_progress: bool,
) -> Result<u64> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }

    let part = part_path(target);
    let mut offset = file_len(&part).await.unwrap_or(0);
    if let Some(size) = file.size {
        // A part file larger than the real file is stale.
        if offset > size {
            offset = 0;
        }
    }

    let mut stream = cancel
        .run_until_cancelled(hub.open_file(model_id, &file.path, offset))
        .await?;
    if !stream.resumed {
        offset = 0;
    }
    tracing::debug!(file = %file.path, offset, resumed = stream.resumed, "Downloading file");

    let mut out = OpenOptions::new()
        .create(true)
        .write(true)
        .append(offset > 0)
        .truncate(offset == 0)
        .open(&part)
        .await?;

    let total = file.size.or(stream.remaining.map(|r| r + offset));
    let pb = progress_bar(show_progress, total, &file.path);
    pb.set_position(offset);

    let mut written = offset;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                out.flush().await?;
                pb.abandon();
                tracing::debug!(file = %file.path, written, "Cancelled, keeping part file");
                return Err(HubError::Cancelled);
            }
            next = stream.chunks.next() => next,
        };

        let Some(chunk) = next else { break };
        let chunk = chunk?;
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
        pb.set_position(written);
    }

    out.flush().await?;
    drop(out);

    if let Some(expected) = file.size {
        if written != expected {
            pb.abandon();
            return Err(HubError::Incomplete {
                path: file.path.clone(),
                expected,
                actual: written,
            });
        }
    }

    fs::rename(&part, target).await?;
    pb.finish_with_message(format!("Downloaded {}", file.path));
    Ok(written - offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{FileStream, Identity, ModelSummary};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory hub serving fixed file contents, honoring offsets.
    #[derive(Default)]
    struct MemoryHub {
        files: Vec<(String, Vec<u8>)>,
        opened: Mutex<Vec<(String, u64)>>,
        /// Cancel this token after the first chunk of any file.
        cancel_after_first_chunk: Option<CancelToken>,
        /// Never answer file listings.
        stall_listing: bool,
        /// Never answer file opens.
        stall_opening: bool,
    }

    impl MemoryHub {
        fn with_files(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(p, d)| (p.to_string(), d.as_bytes().to_vec()))
                    .collect(),
                ..Default::default()
            }
        }

        fn opened(&self) -> Vec<(String, u64)> {
            self.opened.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HubClient for MemoryHub {
        async fn whoami(&self, _token: &str) -> Result<Identity> {
            Ok(Identity {
                name: "tester".to_string(),
            })
        }

        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<ModelSummary>> {
            Ok(Vec::new())
        }

        async fn list_files(&self, model_id: &str) -> Result<Vec<RepoFile>> {
            if self.stall_listing {
                return std::future::pending().await;
            }
            if model_id == "missing/model" {
                return Err(HubError::NotFound(model_id.to_string()));
            }
            Ok(self
                .files
                .iter()
                .map(|(path, data)| RepoFile {
                    path: path.clone(),
                    size: Some(data.len() as u64),
                })
                .collect())
        }

        async fn open_file(&self, _model_id: &str, path: &str, offset: u64) -> Result<FileStream> {
            self.opened.lock().unwrap().push((path.to_string(), offset));
            if self.stall_opening {
                return std::future::pending().await;
            }
            let data = self
                .files
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, d)| d.clone())
                .unwrap_or_default();

            let rest = data[offset as usize..].to_vec();
            let chunks: Vec<Result<Vec<u8>>> =
                rest.chunks(4).map(|c| Ok(c.to_vec())).collect();
            let cancel = self.cancel_after_first_chunk.clone();
            let stream = futures_util::stream::iter(chunks)
                .enumerate()
                .then(move |(i, chunk)| {
                    let cancel = cancel.clone();
                    async move {
                        if i == 1 {
                            if let Some(token) = cancel {
                                token.cancel();
                                tokio::task::yield_now().await;
                            }
                        }
                        chunk
                    }
                });

            Ok(FileStream {
                resumed: offset > 0,
                remaining: Some(rest.len() as u64),
                chunks: stream.boxed(),
            })
        }
    }

    fn read(path: &Path) -> Vec<u8> {
        std::fs::read(path).unwrap()
    }

    #[test]
    fn sanitizes_path_separators() {
        assert_eq!(sanitize_model_id("org/model"), "org_model");
        assert_eq!(sanitize_model_id("org\\model/v2"), "org_model_v2");
        assert_eq!(sanitize_model_id("gpt2"), "gpt2");
    }

    #[test]
    fn model_dir_joins_sanitized_id() {
        let dir = model_dir(Path::new("models"), "org/model");
        assert_eq!(dir, PathBuf::from("models").join("org_model"));
    }

    #[test]
    fn part_path_appends_suffix() {
        let part = part_path(Path::new("/tmp/x/model.safetensors"));
        assert_eq!(part, PathBuf::from("/tmp/x/model.safetensors.part"));
    }

    #[test]
    fn rejects_escaping_paths() {
        let root = Path::new("/tmp/models");
        assert!(local_path(root, "../etc/passwd").is_err());
        assert!(local_path(root, "/etc/passwd").is_err());
        assert!(local_path(root, "").is_err());
        assert_eq!(
            local_path(root, "onnx/model.onnx").unwrap(),
            root.join("onnx/model.onnx")
        );
    }

    #[tokio::test]
    async fn downloads_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("org_model");
        let hub = MemoryHub::with_files(&[
            ("config.json", "{\"a\": 1}"),
            ("weights/model.bin", "0123456789"),
        ]);

        let report = download_snapshot(&hub, "org/model", &dest, &CancelToken::new(), false)
            .await
            .unwrap();

        assert_eq!(report.downloaded, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.bytes, 18);
        assert_eq!(read(&dest.join("config.json")), b"{\"a\": 1}");
        assert_eq!(read(&dest.join("weights/model.bin")), b"0123456789");
        assert!(!part_path(&dest.join("config.json")).exists());
    }

    #[tokio::test]
    async fn skips_complete_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("m");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("config.json"), b"{}").unwrap();

        let hub = MemoryHub::with_files(&[("config.json", "{}"), ("model.bin", "abcdef")]);
        let report = download_snapshot(&hub, "org/model", &dest, &CancelToken::new(), false)
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.downloaded, 1);
        assert_eq!(hub.opened(), vec![("model.bin".to_string(), 0)]);
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("m");
        let hub = MemoryHub::with_files(&[("a.txt", "hello")]);
        let cancel = CancelToken::new();

        download_snapshot(&hub, "org/model", &dest, &cancel, false)
            .await
            .unwrap();
        let again = download_snapshot(&hub, "org/model", &dest, &cancel, false)
            .await
            .unwrap();

        assert_eq!(again.downloaded, 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(again.bytes, 0);
        assert_eq!(hub.opened().len(), 1);
    }

    #[tokio::test]
    async fn redownloads_files_with_wrong_size() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("m");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("a.txt"), b"old").unwrap();

        let hub = MemoryHub::with_files(&[("a.txt", "brand new")]);
        download_snapshot(&hub, "org/model", &dest, &CancelToken::new(), false)
            .await
            .unwrap();

        assert_eq!(read(&dest.join("a.txt")), b"brand new");
    }

    #[tokio::test]
    async fn resumes_from_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("m");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(part_path(&dest.join("model.bin")), b"01234").unwrap();

        let hub = MemoryHub::with_files(&[("model.bin", "0123456789")]);
        let report = download_snapshot(&hub, "org/model", &dest, &CancelToken::new(), false)
            .await
            .unwrap();

        assert_eq!(hub.opened(), vec![("model.bin".to_string(), 5)]);
        assert_eq!(report.bytes, 5);
        assert_eq!(read(&dest.join("model.bin")), b"0123456789");
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let hub = MemoryHub::with_files(&[("a.txt", "hello")]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = download_snapshot(&hub, "org/model", dir.path(), &cancel, false)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(hub.opened().is_empty());
    }

    #[tokio::test]
    async fn cancellation_mid_file_keeps_part_for_resume() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("m");
        let cancel = CancelToken::new();
        let mut hub = MemoryHub::with_files(&[("model.bin", "0123456789abcdef")]);
        hub.cancel_after_first_chunk = Some(cancel.clone());

        let err = download_snapshot(&hub, "org/model", &dest, &cancel, false)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());

        let target = dest.join("model.bin");
        assert!(!target.exists());
        let partial = read(&part_path(&target));
        assert!(!partial.is_empty() && partial.len() < 16);
        assert!(b"0123456789abcdef".starts_with(&partial));

        let hub = MemoryHub::with_files(&[("model.bin", "0123456789abcdef")]);
        download_snapshot(&hub, "org/model", &dest, &CancelToken::new(), false)
            .await
            .unwrap();
        assert_eq!(hub.opened(), vec![("model.bin".to_string(), partial.len() as u64)]);
        assert_eq!(read(&target), b"0123456789abcdef");
    }

    async fn cancel_stalled(hub: &MemoryHub, dest: &Path) -> Result<SnapshotReport> {
        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            canceller.cancel();
        });

        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            download_snapshot(hub, "org/model", dest, &cancel, false),
        )
        .await
        .expect("download should stop once cancelled")
    }

    #[tokio::test]
    async fn cancellation_interrupts_stalled_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut hub = MemoryHub::with_files(&[("a.txt", "hello")]);
        hub.stall_listing = true;

        let err = cancel_stalled(&hub, dir.path()).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(hub.opened().is_empty());
    }

    #[tokio::test]
    async fn cancellation_interrupts_stalled_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut hub = MemoryHub::with_files(&[("a.txt", "hello")]);
        hub.stall_opening = true;

        let err = cancel_stalled(&hub, dir.path()).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(hub.opened(), vec![("a.txt".to_string(), 0)]);
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn hub_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let hub = MemoryHub::default();
        let err = download_snapshot(&hub, "missing/model", dir.path(), &CancelToken::new(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::NotFound(ref id) if id == "missing/model"));
    }

    #[tokio::test]
    async fn destination_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("models").join("org_model");
        let hub = MemoryHub::with_files(&[]);
        let cancel = CancelToken::new();

        for _ in 0..2 {
            let report = download_snapshot(&hub, "org/model", &dest, &cancel, false)
                .await
                .unwrap();
            assert_eq!(report.downloaded + report.skipped, 0);
        }
        assert!(dest.is_dir());
    }
}
