//! Persistence for breakpoints and responsive crops.
//!
//! The pipeline only needs load/save/query-by-parent, expressed as the
//! [`CropRepository`] and [`BreakpointRepository`] traits. [`JsonStore`]
//! implements both over a single versioned JSON file:
//!
//! ```json
//! {
//!   "version": 1,
//!   "breakpoints": [ { "id": 1, "slider_id": 1, "identifier": "desktop", ... } ],
//!   "crops": [ { "crop_id": 1, "banner_id": 12, "breakpoint_id": 1, ... } ]
//! }
//! ```
//!
//! Every save writes through to disk before it becomes visible to readers,
//! so a crash never leaves the file behind the in-memory state. A store
//! without a path lives in memory only.

use crate::types::{Breakpoint, RecordError, ResponsiveCrop};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Version of the store file format.
const STORE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Store file version {found} is not supported (expected {expected})", expected = STORE_VERSION)]
    Version { found: u32 },
    #[error("Invalid record: {0}")]
    Invalid(#[from] RecordError),
    #[error("A crop for banner {banner_id} and breakpoint {breakpoint_id} already exists")]
    DuplicateCrop { banner_id: u32, breakpoint_id: u32 },
    #[error("Store lock poisoned")]
    Poisoned,
}

pub trait CropRepository {
    fn get_crop(&self, crop_id: u32) -> Result<Option<ResponsiveCrop>, StoreError>;

    /// All crops of a banner, by sort order.
    fn crops_for_banner(&self, banner_id: u32) -> Result<Vec<ResponsiveCrop>, StoreError>;

    /// Insert or update; assigns `crop_id` when absent and returns it.
    fn save_crop(&self, crop: &mut ResponsiveCrop) -> Result<u32, StoreError>;
}

pub trait BreakpointRepository {
    fn get_breakpoint(&self, id: u32) -> Result<Option<Breakpoint>, StoreError>;

    /// All breakpoints of a slider, by sort order.
    fn breakpoints_for_slider(&self, slider_id: u32) -> Result<Vec<Breakpoint>, StoreError>;

    /// Validate, then insert or update; assigns `id` when absent and returns it.
    fn save_breakpoint(&self, breakpoint: &mut Breakpoint) -> Result<u32, StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreData {
    version: u32,
    #[serde(default)]
    breakpoints: Vec<Breakpoint>,
    #[serde(default)]
    crops: Vec<ResponsiveCrop>,
}

impl StoreData {
    fn empty() -> Self {
        Self {
            version: STORE_VERSION,
            breakpoints: Vec::new(),
            crops: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct JsonStore {
    path: Option<PathBuf>,
    data: Mutex<StoreData>,
}

impl JsonStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let data: StoreData = serde_json::from_str(&content)?;
            if data.version != STORE_VERSION {
                return Err(StoreError::Version {
                    found: data.version,
                });
            }
            data
        } else {
            StoreData::empty()
        };
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(StoreData::empty()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreData>, StoreError> {
        self.data.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Apply `change` to a copy of the data, persist it, then publish it.
    fn commit<T>(
        &self,
        change: impl FnOnce(&mut StoreData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.lock()?;
        let mut next = data.clone();
        let out = change(&mut next)?;
        self.persist(&next)?;
        *data = next;
        Ok(out)
    }

    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let staging = path.with_extension("json.part");
        std::fs::write(&staging, serde_json::to_string_pretty(data)?)?;
        std::fs::rename(&staging, path)?;
        Ok(())
    }
}

impl CropRepository for JsonStore {
    fn get_crop(&self, crop_id: u32) -> Result<Option<ResponsiveCrop>, StoreError> {
        let data = self.lock()?;
        Ok(data
            .crops
            .iter()
            .find(|c| c.crop_id == Some(crop_id))
            .cloned())
    }

    fn crops_for_banner(&self, banner_id: u32) -> Result<Vec<ResponsiveCrop>, StoreError> {
        let data = self.lock()?;
        let mut crops: Vec<_> = data
            .crops
            .iter()
            .filter(|c| c.banner_id == banner_id)
            .cloned()
            .collect();
        crops.sort_by_key(|c| (c.sort_order, c.crop_id));
        Ok(crops)
    }

    fn save_crop(&self, crop: &mut ResponsiveCrop) -> Result<u32, StoreError> {
        let id = self.commit(|data| {
            let clash = data.crops.iter().any(|c| {
                c.banner_id == crop.banner_id
                    && c.breakpoint_id == crop.breakpoint_id
                    && c.crop_id != crop.crop_id
            });
            if clash {
                return Err(StoreError::DuplicateCrop {
                    banner_id: crop.banner_id,
                    breakpoint_id: crop.breakpoint_id,
                });
            }

            let id = crop.crop_id.unwrap_or_else(|| {
                data.crops.iter().filter_map(|c| c.crop_id).max().unwrap_or(0) + 1
            });
            let mut record = crop.clone();
            record.crop_id = Some(id);
            match data.crops.iter_mut().find(|c| c.crop_id == Some(id)) {
                Some(existing) => *existing = record,
                None => data.crops.push(record),
            }
            Ok(id)
        })?;
        crop.crop_id = Some(id);
        Ok(id)
    }
}

impl BreakpointRepository for JsonStore {
    fn get_breakpoint(&self, id: u32) -> Result<Option<Breakpoint>, StoreError> {
        let data = self.lock()?;
        Ok(data.breakpoints.iter().find(|b| b.id == Some(id)).cloned())
    }

    fn breakpoints_for_slider(&self, slider_id: u32) -> Result<Vec<Breakpoint>, StoreError> {
        let data = self.lock()?;
        let mut breakpoints: Vec<_> = data
            .breakpoints
            .iter()
            .filter(|b| b.slider_id == slider_id)
            .cloned()
            .collect();
        breakpoints.sort_by_key(|b| (b.sort_order, b.id));
        Ok(breakpoints)
    }

    fn save_breakpoint(&self, breakpoint: &mut Breakpoint) -> Result<u32, StoreError> {
        breakpoint.validate()?;
        let id = self.commit(|data| {
            let id = breakpoint.id.unwrap_or_else(|| {
                data.breakpoints.iter().filter_map(|b| b.id).max().unwrap_or(0) + 1
            });
            let mut record = breakpoint.clone();
            record.id = Some(id);
            match data.breakpoints.iter_mut().find(|b| b.id == Some(id)) {
                Some(existing) => *existing = record,
                None => data.breakpoints.push(record),
            }
            Ok(id)
        })?;
        breakpoint.id = Some(id);
        Ok(id)
    }
}
