use super::TicketImage;
use crate::error::ComposeError;
use crate::models::TicketPayload;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Destination for downloaded ticket images
pub trait ImageSink {
    /// Persist `bytes` under `file_name`, returning where they landed
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ComposeError>;
}

/// A file offered to a share surface
#[derive(Debug, Clone, PartialEq)]
pub struct ShareFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub title: String,
    pub text: String,
}

/// Platform share surface
pub trait ShareTarget {
    /// Whether this target accepts `file`
    fn can_share(&self, file: &ShareFile) -> bool;

    fn share(&self, file: &ShareFile) -> Result<(), ComposeError>;
}

/// Writes images into a directory, creating it on first use
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageSink for DirectorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ComposeError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Which path an export took
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Handed to the share target
    Shared,
    /// No share target; the image was stored and its location is returned
    /// for the user to copy
    Reference(PathBuf),
    /// Saved through the image sink
    Downloaded(PathBuf),
}

/// Download and share of composed tickets
pub struct TicketExporter<S: ImageSink> {
    sink: S,
    share: Option<Box<dyn ShareTarget>>,
    reference: DirectorySink,
}

impl<S: ImageSink> TicketExporter<S> {
    /// Exporter without a share surface; shares become references under the
    /// system temp directory
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            share: None,
            reference: DirectorySink::new(std::env::temp_dir().join("ticket_qr")),
        }
    }

    pub fn with_share_target(mut self, target: Box<dyn ShareTarget>) -> Self {
        self.share = Some(target);
        self
    }

    pub fn with_reference_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reference = DirectorySink::new(dir);
        self
    }

    /// Save the ticket through the sink
    pub fn download(&self, image: &TicketImage, payload: &TicketPayload) -> Result<PathBuf, ComposeError> {
        let bytes = image.to_png()?;
        let name = download_file_name(&payload.event_title, &payload.qr_code);
        let path = self.sink.save(&name, &bytes)?;
        info!(path = %path.display(), "ticket downloaded");
        Ok(path)
    }

    /// Share the ticket, falling back to a download when sharing fails
    pub fn share(&self, image: &TicketImage, payload: &TicketPayload) -> Result<ExportOutcome, ComposeError> {
        match self.try_share(image, payload) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(error = %err, "share failed, falling back to download");
                self.download(image, payload).map(ExportOutcome::Downloaded)
            }
        }
    }

    fn try_share(&self, image: &TicketImage, payload: &TicketPayload) -> Result<ExportOutcome, ComposeError> {
        let file = share_file(image.to_png()?, payload);

        if let Some(target) = self.share.as_deref().filter(|t| t.can_share(&file)) {
            target.share(&file)?;
            info!(file = %file.file_name, "ticket shared");
            return Ok(ExportOutcome::Shared);
        }

        let path = self.reference.save(&file.file_name, &file.bytes)?;
        info!(path = %path.display(), "ticket stored for sharing by reference");
        Ok(ExportOutcome::Reference(path))
    }
}

fn share_file(bytes: Vec<u8>, payload: &TicketPayload) -> ShareFile {
    ShareFile {
        file_name: format!("ticket_{}.png", payload.qr_code),
        mime_type: "image/png",
        bytes,
        title: format!("My Ticket for {}", payload.event_title),
        text: format!("I'm going to {}! Here's my ticket.", payload.event_title),
    }
}

/// `ticket_{title}_{code}.png`, with each whitespace run in the title replaced
/// by `_`
pub fn download_file_name(event_title: &str, qr_code: &str) -> String {
    let mut title = String::with_capacity(event_title.len());
    let mut in_space = false;
    for c in event_title.chars() {
        if c.is_whitespace() || c == '/' || c == '\\' {
            if !in_space {
                title.push('_');
            }
            in_space = true;
        } else {
            title.push(c);
            in_space = false;
        }
    }
    format!("ticket_{title}_{qr_code}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::compose;
    use crate::encoder::TicketCodeGenerator;
    use crate::models::{EventMeta, RenderOptions};
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ticket() -> (TicketImage, TicketPayload) {
        let payload = TicketPayload::demo(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        let raster = TicketCodeGenerator::builtin()
            .encode_payload(&payload, &RenderOptions::ticket())
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        (compose(&raster, &payload, &EventMeta::default(), day), payload)
    }

    struct RecordingShare {
        accept: bool,
        fail: bool,
        seen: Rc<RefCell<Vec<ShareFile>>>,
    }

    impl ShareTarget for RecordingShare {
        fn can_share(&self, _: &ShareFile) -> bool {
            self.accept
        }

        fn share(&self, file: &ShareFile) -> Result<(), ComposeError> {
            if self.fail {
                return Err(ComposeError::Share("user dismissed".into()));
            }
            self.seen.borrow_mut().push(file.clone());
            Ok(())
        }
    }

    #[test]
    fn test_download_file_name() {
        assert_eq!(
            download_file_name("Shang-Chi", "QR_SHANCHI_001_EA"),
            "ticket_Shang-Chi_QR_SHANCHI_001_EA.png"
        );
        assert_eq!(
            download_file_name("An  Events'\tEvent", "QR_1"),
            "ticket_An_Events'_Event_QR_1.png"
        );
    }

    #[test]
    fn test_download_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let (image, payload) = ticket();
        let exporter = TicketExporter::new(DirectorySink::new(dir.path()));
        let path = exporter.download(&image, &payload).unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("ticket_Shang-Chi_QR_SHANCHI_001_EA.png")
        );
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (600, 800));
    }

    #[test]
    fn test_share_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (image, payload) = ticket();
        let exporter = TicketExporter::new(DirectorySink::new(dir.path())).with_share_target(Box::new(
            RecordingShare {
                accept: true,
                fail: false,
                seen: Rc::clone(&seen),
            },
        ));

        assert_eq!(exporter.share(&image, &payload).unwrap(), ExportOutcome::Shared);
        let shared = seen.borrow();
        assert_eq!(shared[0].file_name, "ticket_QR_SHANCHI_001_EA.png");
        assert_eq!(shared[0].title, "My Ticket for Shang-Chi");
        assert_eq!(shared[0].text, "I'm going to Shang-Chi! Here's my ticket.");
    }

    #[test]
    fn test_share_without_target_gives_reference() {
        let downloads = tempfile::tempdir().unwrap();
        let refs = tempfile::tempdir().unwrap();
        let (image, payload) = ticket();
        let exporter = TicketExporter::new(DirectorySink::new(downloads.path())).with_reference_dir(refs.path());

        match exporter.share(&image, &payload).unwrap() {
            ExportOutcome::Reference(path) => {
                assert!(path.starts_with(refs.path()));
                assert!(path.exists());
            }
            other => panic!("expected reference, got {other:?}"),
        }
    }

    #[test]
    fn test_refused_share_gives_reference() {
        let refs = tempfile::tempdir().unwrap();
        let (image, payload) = ticket();
        let exporter = TicketExporter::new(DirectorySink::new(refs.path()))
            .with_reference_dir(refs.path())
            .with_share_target(Box::new(RecordingShare {
                accept: false,
                fail: false,
                seen: Rc::default(),
            }));
        assert!(matches!(
            exporter.share(&image, &payload).unwrap(),
            ExportOutcome::Reference(_)
        ));
    }

    #[test]
    fn test_failed_share_falls_back_to_download() {
        let dir = tempfile::tempdir().unwrap();
        let (image, payload) = ticket();
        let exporter = TicketExporter::new(DirectorySink::new(dir.path())).with_share_target(Box::new(
            RecordingShare {
                accept: true,
                fail: true,
                seen: Rc::default(),
            },
        ));

        match exporter.share(&image, &payload).unwrap() {
            ExportOutcome::Downloaded(path) => assert!(path.starts_with(dir.path())),
            other => panic!("expected download, got {other:?}"),
        }
    }
}
