use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::pixels::{load_sample_image, DatasetConfig, SampleImage};
use crate::common::{CaptionError, CaptionResult};

/// Standard COCO 2017 splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Validation,
}

impl Split {
    /// Image directory under the corpus root.
    pub fn image_dir(&self) -> &'static str {
        match self {
            Split::Train => "train2017",
            Split::Validation => "val2017",
        }
    }

    /// Annotation file under `<corpus>/annotations`.
    pub fn annotation_file(&self) -> &'static str {
        match self {
            Split::Train => "captions_train2017.json",
            Split::Validation => "captions_val2017.json",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => f.write_str("train"),
            Split::Validation => f.write_str("validation"),
        }
    }
}

// Only the fields captioning needs; everything else in the file is ignored.
#[derive(Deserialize)]
struct AnnotationIndex {
    images: Vec<ImageRecord>,
    #[serde(default)]
    annotations: Vec<CaptionRecord>,
}

#[derive(Deserialize)]
struct ImageRecord {
    id: u64,
    file_name: String,
}

#[derive(Deserialize)]
struct CaptionRecord {
    image_id: u64,
    caption: String,
}

#[derive(Debug, Clone)]
struct IndexedImage {
    image_id: u64,
    file_name: String,
    captions: Vec<String>,
}

/// One image with every caption written for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionSample {
    pub image_id: u64,
    pub file_name: String,
    pub image: SampleImage,
    pub captions: Vec<String>,
}

/// Image/caption pairs from a COCO-style corpus.
///
/// The annotation index is read once when the dataset is opened; image
/// files are decoded on every [`get`](Self::get). Samples are ordered by
/// ascending image id, and only images with at least one caption are kept.
#[derive(Debug, Clone)]
pub struct CocoCaptions {
    root: PathBuf,
    annotation_file: PathBuf,
    config: DatasetConfig,
    entries: Vec<IndexedImage>,
}

impl CocoCaptions {
    /// Opens a corpus with images under `root` and captions in `annotation_file`.
    pub fn open(
        root: impl AsRef<Path>,
        annotation_file: impl AsRef<Path>,
        config: DatasetConfig,
    ) -> CaptionResult<Self> {
        let root = root.as_ref().to_path_buf();
        let annotation_file = annotation_file.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(CaptionError::MissingData {
                what: "image directory",
                path: root,
            });
        }
        if !annotation_file.is_file() {
            return Err(CaptionError::MissingData {
                what: "annotation file",
                path: annotation_file,
            });
        }

        let entries = read_index(&annotation_file)?;

        log::info!(
            "Opened caption corpus {}: {} captioned images",
            root.display(),
            entries.len()
        );

        Ok(Self {
            root,
            annotation_file,
            config,
            entries,
        })
    }

    /// Opens a split of a corpus laid out as
    /// `<corpus>/train2017` with `<corpus>/annotations/captions_train2017.json`
    /// (and the `val2017` equivalents).
    pub fn open_split(
        corpus_dir: impl AsRef<Path>,
        split: Split,
        config: DatasetConfig,
    ) -> CaptionResult<Self> {
        let corpus_dir = corpus_dir.as_ref();
        Self::open(
            corpus_dir.join(split.image_dir()),
            corpus_dir.join("annotations").join(split.annotation_file()),
            config,
        )
    }

    /// Number of captioned images. Index entries with no caption are not
    /// counted; in a COCO split every image has one, so this is the size of
    /// the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn annotation_file(&self) -> &Path {
        &self.annotation_file
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    fn entry(&self, index: usize) -> CaptionResult<&IndexedImage> {
        self.entries.get(index).ok_or(CaptionError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    /// Captions of sample `index`, without decoding its image.
    pub fn captions(&self, index: usize) -> CaptionResult<&[String]> {
        Ok(&self.entry(index)?.captions)
    }

    pub fn image_id(&self, index: usize) -> CaptionResult<u64> {
        Ok(self.entry(index)?.image_id)
    }

    /// Decodes sample `index`.
    pub fn get(&self, index: usize) -> CaptionResult<CaptionSample> {
        let entry = self.entry(index)?;
        let path = self.root.join(&entry.file_name);
        if !path.is_file() {
            return Err(CaptionError::MissingData {
                what: "image file",
                path,
            });
        }
        let image = load_sample_image(&path, &self.config)?;

        Ok(CaptionSample {
            image_id: entry.image_id,
            file_name: entry.file_name.clone(),
            image,
            captions: entry.captions.clone(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = CaptionResult<CaptionSample>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
}

fn read_index(path: &Path) -> CaptionResult<Vec<IndexedImage>> {
    let contents = std::fs::read_to_string(path).map_err(|source| CaptionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let index: AnnotationIndex =
        serde_json::from_str(&contents).map_err(|source| CaptionError::Annotation {
            path: path.to_path_buf(),
            source,
        })?;

    let mut by_id: BTreeMap<u64, IndexedImage> = BTreeMap::new();
    for record in index.images {
        let previous = by_id.insert(
            record.id,
            IndexedImage {
                image_id: record.id,
                file_name: record.file_name,
                captions: Vec::new(),
            },
        );
        if previous.is_some() {
            log::warn!("Image id {} listed more than once; keeping the last entry", record.id);
        }
    }

    let mut orphans = 0usize;
    for record in index.annotations {
        match by_id.get_mut(&record.image_id) {
            Some(entry) => entry.captions.push(record.caption),
            None => orphans += 1,
        }
    }
    if orphans > 0 {
        log::debug!("Ignored {} captions for unknown image ids", orphans);
    }

    let entries: Vec<IndexedImage> = by_id
        .into_values()
        .filter(|entry| {
            if entry.captions.is_empty() {
                log::warn!(
                    "Skipping image {} ({}): no captions",
                    entry.image_id,
                    entry.file_name
                );
                false
            } else {
                true
            }
        })
        .collect();

    Ok(entries)
}
