//! Pre-authored voxel footprints that pieces are stamped from.

use super::Block;
use crate::bounds::BoundingBox;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, io, path::Path, sync::Arc};
use tracing::{debug, warn};
use vek::*;

/// A marker baked into a template. The asset format stores markers as raw
/// strings; they are decoded by prefix once, when the template is loaded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Marker {
    /// A container, with an optional loot table (`"chest:loot/end_city"`).
    Chest { loot: Option<String> },
    Sentry,
    Elytra,
    Drowned,
    /// Anything else. Dispatching it does nothing.
    Unknown(String),
}

impl From<String> for Marker {
    fn from(raw: String) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("chest") {
            let loot = raw
                .split_once(':')
                .map(|(_, table)| table.trim().to_owned())
                .filter(|table| !table.is_empty());
            Marker::Chest { loot }
        } else if lower.starts_with("sentry") {
            Marker::Sentry
        } else if lower.starts_with("elytra") {
            Marker::Elytra
        } else if lower.starts_with("drowned") {
            Marker::Drowned
        } else {
            Marker::Unknown(raw)
        }
    }
}

impl From<&str> for Marker {
    fn from(raw: &str) -> Self { Self::from(raw.to_owned()) }
}

impl From<Marker> for String {
    fn from(marker: Marker) -> Self {
        match marker {
            Marker::Chest { loot: Some(loot) } => format!("Chest:{}", loot),
            Marker::Chest { loot: None } => "Chest".to_owned(),
            Marker::Sentry => "Sentry".to_owned(),
            Marker::Elytra => "Elytra".to_owned(),
            Marker::Drowned => "Drowned".to_owned(),
            Marker::Unknown(raw) => raw,
        }
    }
}

/// A box of voxels in local space, `(0, 0, 0)..size`. Cells that are not listed
/// leave the world untouched when the template is placed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub size: Vec3<i32>,
    pub blocks: Vec<(Vec3<i32>, Block)>,
    pub markers: Vec<(Vec3<i32>, Marker)>,
}

impl Template {
    pub fn builder(size: Vec3<i32>) -> TemplateBuilder {
        TemplateBuilder {
            size,
            cells: HashMap::new(),
            markers: Vec::new(),
        }
    }

    pub fn bounds(&self) -> BoundingBox { BoundingBox::from_origin_size(Vec3::zero(), self.size) }

    pub fn from_ron(s: &str) -> Result<Self, TemplateError> {
        let template: Template = ron::de::from_str(s).map_err(|e| TemplateError::Parse(e.to_string()))?;
        template.validate()?;
        Ok(template)
    }

    pub fn to_ron(&self) -> Result<String, TemplateError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| TemplateError::Parse(e.to_string()))
    }

    fn validate(&self) -> Result<(), TemplateError> {
        let bounds = self.bounds();
        if self.size.reduce_min() <= 0 {
            return Err(TemplateError::Invalid(format!("non-positive size {:?}", self.size)));
        }
        let outside = self
            .blocks
            .iter()
            .map(|(pos, _)| *pos)
            .chain(self.markers.iter().map(|(pos, _)| *pos))
            .find(|pos| !bounds.contains(*pos));
        match outside {
            Some(pos) => Err(TemplateError::Invalid(format!(
                "cell {:?} lies outside of {:?}",
                pos, bounds
            ))),
            None => Ok(()),
        }
    }
}

/// Assembles a [`Template`] out of boxes.
pub struct TemplateBuilder {
    size: Vec3<i32>,
    cells: HashMap<Vec3<i32>, Block>,
    markers: Vec<(Vec3<i32>, Marker)>,
}

impl TemplateBuilder {
    fn local_box(&self, min: Vec3<i32>, max: Vec3<i32>) -> BoundingBox {
        BoundingBox::from_corners(min, max)
    }

    /// Fill the box, clipped to the template.
    pub fn fill(mut self, min: Vec3<i32>, max: Vec3<i32>, block: Block) -> Self {
        let bounds = BoundingBox::from_origin_size(Vec3::zero(), self.size);
        for pos in self.local_box(min, max).iter().filter(|p| bounds.contains(*p)) {
            self.cells.insert(pos, block);
        }
        self
    }

    /// Walls, floor and ceiling of the whole template, air inside.
    pub fn hollow(self, wall: Block) -> Self {
        let max = self.size - 1;
        self.fill(Vec3::zero(), max, wall)
            .fill(Vec3::one(), max - 1, Block::empty())
    }

    /// A floor slab with open air above it.
    pub fn platform(self, floor: Block) -> Self {
        let max = self.size - 1;
        self.fill(Vec3::zero(), Vec3::new(max.x, 0, max.z), floor)
            .fill(Vec3::new(0, 1, 0), max, Block::empty())
    }

    pub fn marker(mut self, pos: Vec3<i32>, marker: impl Into<Marker>) -> Self {
        self.markers.push((pos, marker.into()));
        self
    }

    pub fn build(self) -> Template {
        let mut blocks = self.cells.into_iter().collect::<Vec<_>>();
        // Hash order is arbitrary, keep placement order stable
        blocks.sort_by_key(|(pos, _)| (pos.y, pos.z, pos.x));
        Template {
            size: self.size,
            blocks,
            markers: self.markers,
        }
    }
}

#[derive(Debug)]
pub enum TemplateError {
    Io(io::Error),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TemplateError::Io(e) => write!(f, "failed to read template: {}", e),
            TemplateError::Parse(e) => write!(f, "failed to parse template: {}", e),
            TemplateError::Invalid(e) => write!(f, "invalid template: {}", e),
        }
    }
}

impl std::error::Error for TemplateError {}

impl From<io::Error> for TemplateError {
    fn from(e: io::Error) -> Self { TemplateError::Io(e) }
}

/// Read-only lookup of templates by identifier.
pub trait TemplateSource: Sync {
    fn get(&self, id: &str) -> Option<Arc<Template>>;
}

#[derive(Default)]
pub struct TemplateManager {
    templates: HashMap<String, Arc<Template>>,
}

impl TemplateManager {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, id: impl Into<String>, template: Template) {
        self.templates.insert(id.into(), Arc::new(template));
    }

    pub fn with(mut self, templates: impl IntoIterator<Item = (String, Template)>) -> Self {
        for (id, template) in templates {
            self.insert(id, template);
        }
        self
    }

    pub fn len(&self) -> usize { self.templates.len() }

    pub fn is_empty(&self) -> bool { self.templates.is_empty() }

    /// Load every `*.ron` file below `dir`. The identifier of a template is its
    /// path relative to `dir`, without the extension, using `/` as separator.
    /// Templates that fail to load are skipped with a warning.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, TemplateError> {
        let mut loaded = 0;
        let mut stack = vec![dir.to_path_buf()];
        while let Some(path) = stack.pop() {
            for entry in fs::read_dir(&path)? {
                let path = entry?.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                if path.extension().map_or(true, |ext| ext != "ron") {
                    continue;
                }
                let id = path
                    .strip_prefix(dir)
                    .unwrap_or(&path)
                    .with_extension("")
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                match fs::read_to_string(&path)
                    .map_err(TemplateError::from)
                    .and_then(|s| Template::from_ron(&s))
                {
                    Ok(template) => {
                        debug!(?id, "Loaded template");
                        self.insert(id, template);
                        loaded += 1;
                    },
                    Err(e) => warn!(?path, ?e, "Skipping template that failed to load"),
                }
            }
        }
        Ok(loaded)
    }
}

impl TemplateSource for TemplateManager {
    fn get(&self, id: &str) -> Option<Arc<Template>> { self.templates.get(id).cloned() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::BlockKind;

    #[test]
    fn markers_decode_by_prefix() {
        assert_eq!(Marker::from("Chest"), Marker::Chest { loot: None });
        assert_eq!(Marker::from("chest:loot/end_city"), Marker::Chest {
            loot: Some("loot/end_city".to_owned())
        });
        assert_eq!(Marker::from("Sentry"), Marker::Sentry);
        assert_eq!(Marker::from("drowned_2"), Marker::Drowned);
        assert_eq!(Marker::from("Elytra"), Marker::Elytra);
        assert_eq!(
            Marker::from("banner"),
            Marker::Unknown("banner".to_owned())
        );
    }

    #[test]
    fn hollow_template() {
        let t = Template::builder(Vec3::new(3, 3, 3))
            .hollow(Block::of(BlockKind::Purpur))
            .marker(Vec3::new(1, 1, 1), "Chest")
            .build();
        assert_eq!(t.blocks.len(), 27);
        let center = t
            .blocks
            .iter()
            .find(|(pos, _)| *pos == Vec3::one())
            .map(|(_, b)| *b);
        assert_eq!(center, Some(Block::empty()));
    }

    #[test]
    fn ron_round_trip_keeps_raw_markers() {
        let t = Template::builder(Vec3::new(4, 2, 4))
            .platform(Block::of(BlockKind::Brick))
            .marker(Vec3::new(1, 1, 1), "Drowned")
            .marker(Vec3::new(2, 1, 2), "weird_marker")
            .build();
        let s = t.to_ron().unwrap();
        assert!(s.contains("\"weird_marker\""));
        assert_eq!(Template::from_ron(&s).unwrap(), t);
    }

    #[test]
    fn out_of_bounds_cells_are_rejected() {
        let mut t = Template::builder(Vec3::new(2, 2, 2)).build();
        t.markers.push((Vec3::new(5, 0, 0), Marker::Sentry));
        let s = t.to_ron().unwrap();
        assert!(matches!(Template::from_ron(&s), Err(TemplateError::Invalid(_))));
    }
}
