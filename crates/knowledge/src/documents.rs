//! Source document discovery and text extraction.

use crate::types::{Document, DocumentFormat};
use ragent_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// File written by [`DocumentStore::seed_if_empty`].
pub const SAMPLE_DOCUMENT_NAME: &str = "sample.txt";

/// Suffixes tried for unnamed documents added within the same second.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Text of the sample document.
pub const SAMPLE_DOCUMENT: &str = "Sample Document - About Artificial Intelligence

Artificial Intelligence (AI) is the simulation of human intelligence processes by machines,
especially computer systems. These processes include:

1. Learning - AI systems can learn from data and improve their performance
2. Reasoning - AI can use logic to solve problems and make decisions
3. Problem-solving - AI can identify and solve complex problems
4. Language Processing - AI can understand and generate human language

Types of AI:
- Narrow AI: Designed for specific tasks
- General AI: Hypothetical AI with human-level intelligence
- Super AI: Theoretical AI surpassing human intelligence

Applications of AI:
- Natural Language Processing
- Computer Vision
- Robotics
- Healthcare
- Finance
- Education

Machine Learning is a subset of AI that enables systems to learn and improve from experience.
Deep Learning uses artificial neural networks with multiple layers.

AI is transforming industries and society with both opportunities and challenges.";

/// The directory of documents an index is built from.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
    seed_sample: bool,
}

/// A supported file found under the store root.
#[derive(Debug, Clone)]
struct SourceFile {
    name: String,
    path: PathBuf,
    format: DocumentFormat,
}

impl DocumentStore {
    /// Create a store over `root`. With `seed_sample`, an empty store gets a
    /// sample document on the next [`seed_if_empty`](Self::seed_if_empty).
    pub fn new(root: impl Into<PathBuf>, seed_sample: bool) -> Self {
        Self {
            root: root.into(),
            seed_sample,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read every supported document, sorted by name.
    ///
    /// Unreadable files are skipped with a warning. A missing directory holds
    /// no documents.
    pub fn list_documents(&self) -> AppResult<Vec<Document>> {
        let mut documents = Vec::new();

        for file in self.source_files()? {
            match parse_file(&file.path, file.format) {
                Ok(content) => documents.push(Document {
                    name: file.name,
                    format: file.format,
                    content,
                }),
                Err(e) => tracing::warn!("Skipping {:?}: {}", file.path, e),
            }
        }

        tracing::debug!(
            "Listed {} documents under {:?}",
            documents.len(),
            self.root
        );
        Ok(documents)
    }

    /// Write the sample document when seeding is enabled and no supported
    /// documents exist. Returns whether a document was written.
    pub fn seed_if_empty(&self) -> AppResult<bool> {
        if !self.seed_sample || !self.source_files()?.is_empty() {
            return Ok(false);
        }

        fs::create_dir_all(&self.root)?;
        fs::write(self.root.join(SAMPLE_DOCUMENT_NAME), SAMPLE_DOCUMENT)?;
        tracing::info!("No documents found; wrote {} to {:?}", SAMPLE_DOCUMENT_NAME, self.root);
        Ok(true)
    }

    /// Write a new plain-text document and return its path.
    ///
    /// Existing files are never replaced. Without a name,
    /// `document_<unix seconds>.txt` is used, with a `_<n>` suffix when that
    /// name is taken. A caller-supplied name that already exists is rejected.
    /// Names without an extension get `.txt`.
    pub fn add_document(&self, content: &str, name: Option<&str>) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let path = match name {
            Some(name) => {
                let path = self.root.join(validate_document_name(name)?);
                create_document(&path, content).map_err(|e| match e.kind() {
                    io::ErrorKind::AlreadyExists => AppError::InvalidRequest(format!(
                        "Document '{}' already exists",
                        name.trim()
                    )),
                    _ => AppError::Io(e),
                })?;
                path
            }
            None => self.write_unnamed(content)?,
        };

        tracing::info!("Added document {:?} ({} chars)", path, content.chars().count());
        Ok(path)
    }

    /// Write under the first free `document_<secs>[_<n>].txt` name.
    fn write_unnamed(&self, content: &str) -> AppResult<PathBuf> {
        let stem = format!("document_{}", chrono::Utc::now().timestamp());

        for n in 0..MAX_NAME_ATTEMPTS {
            let file_name = if n == 0 {
                format!("{}.txt", stem)
            } else {
                format!("{}_{}.txt", stem, n)
            };
            let path = self.root.join(file_name);
            match create_document(&path, content) {
                Ok(()) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(AppError::Io(e)),
            }
        }

        Err(AppError::InvalidRequest(format!(
            "No free document name for {}; pass an explicit name",
            stem
        )))
    }

    /// SHA-256 over the names and raw bytes of every supported file.
    ///
    /// Any added, removed or edited document changes the fingerprint.
    pub fn fingerprint(&self) -> AppResult<String> {
        let mut hasher = Sha256::new();

        for file in self.source_files()? {
            hasher.update(file.name.as_bytes());
            hasher.update([0u8]);
            match fs::read(&file.path) {
                Ok(bytes) => {
                    hasher.update((bytes.len() as u64).to_le_bytes());
                    hasher.update(&bytes);
                }
                Err(e) => tracing::warn!("Cannot fingerprint {:?}: {}", file.path, e),
            }
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Supported files under the root, sorted by relative name.
    fn source_files(&self) -> AppResult<Vec<SourceFile>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        if !self.root.is_dir() {
            return Err(AppError::Config(format!(
                "Documents path is not a directory: {:?}",
                self.root
            )));
        }

        let mut files: Vec<SourceFile> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let format = DocumentFormat::from_path(e.path())?;
                let name = relative_name(&self.root, e.path())?;
                Some(SourceFile {
                    name,
                    path: e.into_path(),
                    format,
                })
            })
            .collect();

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

/// Extract the text of one file.
pub fn parse_file(path: &Path, format: DocumentFormat) -> AppResult<String> {
    match format {
        DocumentFormat::PlainText | DocumentFormat::Markdown => fs::read_to_string(path)
            .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e))),
        DocumentFormat::Pdf => extract_pdf_text(path),
    }
}

/// Extract text page by page. Pages that fail to decode are skipped.
fn extract_pdf_text(path: &Path) -> AppResult<String> {
    let pdf = lopdf::Document::load(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open PDF {:?}: {}", path, e)))?;

    let mut text = String::new();
    for page in pdf.get_pages().keys() {
        match pdf.extract_text(&[*page]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                if !page_text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Err(e) => tracing::warn!("Skipping page {} of {:?}: {}", page, path, e),
        }
    }

    Ok(text)
}

/// Create `path` and write `content`, failing if the file exists.
fn create_document(path: &Path, content: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(content.as_bytes())
}

/// Check a caller-supplied document name and normalize its extension.
///
/// Names must be a single path component. PDFs cannot be added as text.
pub fn validate_document_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest(
            "Document name cannot be empty".to_string(),
        ));
    }

    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || name.contains('/') || name.contains('\\') || name.starts_with('.') {
        return Err(AppError::InvalidRequest(format!(
            "Invalid document name '{}': use a plain file name without path separators",
            name
        )));
    }

    match DocumentFormat::from_path(Path::new(name)) {
        Some(DocumentFormat::Pdf) => Err(AppError::InvalidRequest(format!(
            "Cannot add '{}' as text: PDF documents must be copied into the documents directory",
            name
        ))),
        Some(_) => Ok(name.to_string()),
        None if Path::new(name).extension().is_none() => Ok(format!("{}.txt", name)),
        None => Err(AppError::InvalidRequest(format!(
            "Unsupported document extension in '{}': use .txt or .md",
            name
        ))),
    }
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
