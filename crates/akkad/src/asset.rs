//! Asset descriptors and instantiable entity templates.
//!
//! The scene core never loads files on its own. It resolves names and ids
//! through an [`AssetRegistry`] that the host fills, either by hand or from a
//! JSON manifest:
//!
//! ```json
//! [
//!   { "id": "7f1c", "name": "ui_font", "kind": "Font", "path": "fonts/ui.ttf" },
//!   { "id": "a002", "name": "crate", "kind": "InstantiableEntity", "path": "prefabs/crate.json" }
//! ]
//! ```
//!
//! Instantiable entities are stored as [`SceneData`] documents. A template
//! loaded from a manifest reads its document on first use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AkkadError, Result};
use crate::scene::serialize::SceneData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Font,
    Material,
    Texture,
    InstantiableEntity,
    Scene,
}

/// What the registry knows about one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub id: String,
    pub name: String,
    pub kind: AssetKind,
    #[serde(default)]
    pub path: PathBuf,
}

/// Name/id lookup for assets plus an in-memory template store.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    by_id: HashMap<String, AssetDescriptor>,
    id_by_name: HashMap<String, String>,
    templates: HashMap<String, SceneData>,
    root: PathBuf,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a manifest. Descriptor paths are relative to the manifest's
    /// directory.
    pub fn from_manifest(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let descriptors: Vec<AssetDescriptor> = serde_json::from_str(&text)?;
        let mut registry = Self {
            root: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            ..Self::default()
        };
        for descriptor in descriptors {
            registry.register(descriptor);
        }
        log::info!("asset manifest {} loaded ({} assets)", path.display(), registry.len());
        Ok(registry)
    }

    /// Add or replace a descriptor.
    pub fn register(&mut self, descriptor: AssetDescriptor) {
        self.id_by_name
            .insert(descriptor.name.clone(), descriptor.id.clone());
        self.by_id.insert(descriptor.id.clone(), descriptor);
    }

    /// Register an in-memory template under `name`.
    pub fn register_template(&mut self, name: impl Into<String>, data: SceneData) {
        let name = name.into();
        if !self.id_by_name.contains_key(&name) {
            self.register(AssetDescriptor {
                id: name.clone(),
                name: name.clone(),
                kind: AssetKind::InstantiableEntity,
                path: PathBuf::new(),
            });
        }
        self.templates.insert(name, data);
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn descriptor_by_id(&self, id: &str) -> Result<&AssetDescriptor> {
        self.by_id
            .get(id)
            .ok_or_else(|| AkkadError::AssetResolution(id.to_string()))
    }

    pub fn descriptor_by_name(&self, name: &str) -> Result<&AssetDescriptor> {
        self.id_by_name
            .get(name)
            .and_then(|id| self.by_id.get(id))
            .ok_or_else(|| AkkadError::AssetResolution(name.to_string()))
    }

    /// Absolute-ish path of an asset (manifest directory joined with its path).
    pub fn resolve_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(&self.descriptor_by_name(name)?.path))
    }

    /// The template document for an instantiable entity.
    ///
    /// Templates registered in memory are returned directly; otherwise the
    /// descriptor's file is read and cached.
    pub fn template(&mut self, name: &str) -> Result<&SceneData> {
        if !self.templates.contains_key(name) {
            let descriptor = self.descriptor_by_name(name)?;
            if descriptor.kind != AssetKind::InstantiableEntity {
                return Err(AkkadError::AssetResolution(format!(
                    "{name} is a {:?}, not an instantiable entity",
                    descriptor.kind
                )));
            }
            let path = self.root.join(&descriptor.path);
            let text = std::fs::read_to_string(&path)?;
            let data: SceneData = serde_json::from_str(&text)?;
            self.templates.insert(name.to_string(), data);
        }
        self.templates
            .get(name)
            .ok_or_else(|| AkkadError::AssetResolution(name.to_string()))
    }
}
