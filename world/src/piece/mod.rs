pub mod painter;

pub use self::painter::{BlitOptions, Painter};

use crate::{
    section::{Lineage, Socket},
    site::{end_city::EndCityPiece, fortress::FortressPiece, ruin::RuinPiece},
    Error,
};
use common::{
    generation::ChunkSupplement,
    ori::{Mirror, Orientation, Rotation},
    store::Id,
    terrain::{Marker, Template, TemplateSource},
    vol::WriteLevel,
    BoundingBox,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use vek::*;

pub fn load_template(templates: &dyn TemplateSource, id: &str) -> Result<Arc<Template>, Error> {
    templates.get(id).ok_or_else(|| {
        error!(?id, "Structure needs a template that does not exist");
        Error::MissingTemplate(id.to_owned())
    })
}

/// What a piece is, and the family specific data it carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PieceKind {
    EndCity(EndCityPiece),
    Fortress(FortressPiece),
    Ruin(RuinPiece),
}

impl PieceKind {
    pub fn template_id(&self) -> Option<&str> {
        match self {
            PieceKind::EndCity(p) => Some(&p.template),
            PieceKind::Ruin(p) => Some(&p.template),
            PieceKind::Fortress(_) => None,
        }
    }

    /// Size before orientation.
    pub fn size(&self, templates: &dyn TemplateSource) -> Result<Vec3<i32>, Error> {
        match (self, self.template_id()) {
            (PieceKind::Fortress(p), _) => Ok(p.kind.size()),
            (_, Some(id)) => Ok(load_template(templates, id)?.size),
            (_, None) => Ok(Vec3::one()),
        }
    }
}

/// Mutable bookkeeping of a piece that outlives generation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceState {
    /// A spawner is still owed to the world.
    pub needs_spawner: bool,
    /// A chest is still owed to the world.
    pub needs_chest: bool,
    /// World positions of the markers dispatched so far.
    pub markers: Vec<Vec3<i32>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Piece {
    pub kind: PieceKind,
    pub anchor: Vec3<i32>,
    pub orient: Orientation,
    pub bounds: BoundingBox,
    pub depth: u32,
    /// Shared by every piece created by the same expansion. Only meaningful
    /// while the structure is being generated.
    pub lineage: Option<Id<Lineage>>,
    pub state: PieceState,
}

impl Piece {
    pub fn new(
        kind: PieceKind,
        anchor: Vec3<i32>,
        orient: Orientation,
        templates: &dyn TemplateSource,
    ) -> Result<Self, Error> {
        let size = kind.size(templates)?;
        Ok(Self::sized(kind, anchor, orient, size, PieceState::default()))
    }

    pub fn sized(
        kind: PieceKind,
        anchor: Vec3<i32>,
        orient: Orientation,
        size: Vec3<i32>,
        state: PieceState,
    ) -> Self {
        Self {
            kind,
            anchor,
            orient,
            bounds: BoundingBox::oriented(anchor, size, orient),
            depth: 0,
            lineage: None,
            state,
        }
    }

    pub fn socket(&self) -> Socket {
        Socket {
            anchor: self.anchor,
            orient: self.orient,
            bounds: self.bounds,
            depth: self.depth,
            lineage: self.lineage,
        }
    }

    pub fn translate(&mut self, by: Vec3<i32>) {
        self.anchor += by;
        self.bounds = self.bounds.translated(by);
    }

    pub fn to_record(&self) -> PieceRecord {
        PieceRecord {
            kind: self.kind.clone(),
            anchor: self.anchor,
            rotation: self.orient.rotation,
            mirror: self.orient.mirror,
            depth: self.depth,
            state: self.state.clone(),
        }
    }

    /// Rebuild a piece from its record without generating anything.
    pub fn from_record(record: PieceRecord, templates: &dyn TemplateSource) -> Result<Self, Error> {
        let size = record.kind.size(templates)?;
        let mut piece = Self::sized(
            record.kind,
            record.anchor,
            Orientation::new(record.mirror, record.rotation),
            size,
            record.state,
        );
        piece.depth = record.depth;
        Ok(piece)
    }

    /// Whether rendering extends supports below the piece's bounds, down to
    /// the ground.
    pub fn drops_columns(&self) -> bool { matches!(self.kind, PieceKind::Fortress(_)) }

    /// Write the part of this piece that lies inside `clip` into `level`.
    ///
    /// Pieces that drop columns need every clip meeting their footprint to
    /// span from the bottom of the level to the top of the piece, and fail
    /// with [`Error::PartialColumn`] otherwise.
    pub fn materialize(
        &mut self,
        level: &mut dyn WriteLevel,
        clip: BoundingBox,
        templates: &dyn TemplateSource,
        supplement: &mut ChunkSupplement,
        seed: u32,
    ) -> Result<(), Error> {
        if self.drops_columns() && self.bounds.intersects_xz(&clip) {
            // Supports read the column below the piece, so it must be whole
            let floor = level.min_height();
            if clip.min.y > floor || clip.max.y < self.bounds.max.y {
                return Err(Error::PartialColumn {
                    bottom: clip.min.y,
                    top: clip.max.y,
                });
            }
        } else if !self.bounds.intersects(&clip) {
            return Ok(());
        }
        let mut painter = Painter::new(level, clip, self.anchor, self.orient);
        let markers = match &self.kind {
            PieceKind::EndCity(p) => p.render(&mut painter, templates)?,
            PieceKind::Ruin(p) => p.render(&mut painter, templates, seed)?,
            PieceKind::Fortress(p) => {
                p.render(&mut painter, &mut self.state, supplement, seed);
                Vec::new()
            },
        };
        for (pos, marker) in markers {
            self.handle_marker(&marker, pos, &mut painter, supplement, seed);
        }
        Ok(())
    }

    /// React to a marker of this piece's template at world position `pos`.
    pub fn handle_marker(
        &mut self,
        marker: &Marker,
        pos: Vec3<i32>,
        painter: &mut Painter,
        supplement: &mut ChunkSupplement,
        seed: u32,
    ) {
        let handled = match &self.kind {
            PieceKind::EndCity(p) => p.handle_marker(marker, pos, painter, supplement, seed),
            PieceKind::Ruin(p) => p.handle_marker(marker, pos, painter, supplement, seed),
            PieceKind::Fortress(_) => false,
        };
        if handled && !self.state.markers.contains(&pos) {
            self.state.markers.push(pos);
        }
    }
}

/// The persisted form of a [`Piece`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PieceRecord {
    pub kind: PieceKind,
    pub anchor: Vec3<i32>,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub mirror: Mirror,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub state: PieceState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::end_city;
    use common::terrain::TemplateManager;

    #[test]
    fn bounds_follow_orientation() {
        let templates = TemplateManager::new().with(end_city::templates());
        let piece = Piece::new(
            PieceKind::EndCity(EndCityPiece::new("bridge_piece", true)),
            Vec3::new(10, 64, 10),
            Orientation::rotation(Rotation::Clockwise90),
            &templates,
        )
        .unwrap();
        // 5 wide, 6 high, 4 deep, turned so that its depth runs along x
        assert_eq!(piece.bounds.size(), Vec3::new(4, 6, 5));
        assert!(piece.bounds.contains(Vec3::new(10, 64, 10)));
        assert_eq!(piece.bounds.min.x, 7);
    }

    #[test]
    fn records_rebuild_the_same_piece() {
        let templates = TemplateManager::new().with(end_city::templates());
        let mut piece = Piece::new(
            PieceKind::EndCity(EndCityPiece::new("tower_top", true)),
            Vec3::new(-3, 70, 8),
            Orientation::new(Mirror::FrontBack, Rotation::CounterClockwise90),
            &templates,
        )
        .unwrap();
        piece.depth = 3;
        piece.state.markers.push(Vec3::new(1, 2, 3));

        let s = ron::ser::to_string(&piece.to_record()).unwrap();
        let record: PieceRecord = ron::de::from_str(&s).unwrap();
        assert_eq!(Piece::from_record(record, &templates).unwrap(), piece);
    }

    #[test]
    fn unknown_templates_are_reported() {
        let templates = TemplateManager::new();
        let res = Piece::new(
            PieceKind::EndCity(EndCityPiece::new("no_such_piece", true)),
            Vec3::zero(),
            Orientation::IDENTITY,
            &templates,
        );
        assert!(matches!(res, Err(Error::MissingTemplate(id)) if id == "end_city/no_such_piece"));
    }
}
