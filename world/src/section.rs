//! Growing a structure out of sections.
//!
//! A [`Section`] appends the pieces of one step of a structure to a [`Batch`].
//! [`expand`] runs a section and accepts the batch into the structure only if
//! it does not overlap anything it is not allowed to touch. Every batch gets
//! its own [`Lineage`]; a batch may freely overlap pieces that share the
//! lineage of the piece it grew from, which is how children sit inside the
//! walls of their parents.

use crate::{
    config::GenSettings,
    piece::{load_template, Piece},
    Error,
};
use common::{
    ori::{Orientation, Rotation},
    store::{Id, Store},
    terrain::{Template, TemplateSource},
    BoundingBox,
};
use rand::Rng;
use std::sync::Arc;
use tracing::trace;
use vek::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Lineage {
    /// The lineage of the piece the batch grew from.
    pub parent: Option<Id<Lineage>>,
    pub depth: u32,
}

/// Whether `ancestor` is `lineage` itself or one of its ancestors.
pub fn descends_from(lineages: &Store<Lineage>, lineage: Id<Lineage>, ancestor: Id<Lineage>) -> bool {
    let mut current = Some(lineage);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = lineages[id].parent;
    }
    false
}

/// The frame of the piece a section attaches to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Socket {
    pub anchor: Vec3<i32>,
    pub orient: Orientation,
    pub bounds: BoundingBox,
    pub depth: u32,
    pub lineage: Option<Id<Lineage>>,
}

impl Socket {
    /// A frame with nothing attached to it yet.
    pub fn root(anchor: Vec3<i32>, orient: Orientation) -> Self {
        Self {
            anchor,
            orient,
            bounds: BoundingBox::from_corners(anchor, anchor),
            depth: 0,
            lineage: None,
        }
    }

    /// World position of a point given in this frame.
    pub fn attach(&self, offset: Vec3<i32>) -> Vec3<i32> { self.anchor + self.orient.apply(offset) }

    /// Orientation of a child turned by `turn` relative to this frame.
    pub fn turned(&self, turn: Rotation) -> Orientation { self.orient.turned(turn) }

    /// The same frame, without the right to overlap the pieces it belongs to.
    #[must_use]
    pub fn detached(mut self) -> Self {
        self.lineage = None;
        self
    }
}

/// Counters collected over one assembly attempt.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GenStats {
    pub batches: u32,
    pub accepted: u32,
    pub collisions: u32,
    pub depth_exceeded: u32,
    pub declined: u32,
    pub deepest: u32,
}

/// Everything a section needs while it generates. One context lives for
/// exactly one assembly attempt.
pub struct GenCtx<'a, R, S> {
    pub rng: &'a mut R,
    pub templates: &'a dyn TemplateSource,
    pub settings: &'a GenSettings,
    /// State shared by every section of the structure, such as whether its
    /// unique terminus has been placed yet.
    pub state: S,
    pub lineages: Store<Lineage>,
    pub stats: GenStats,
}

impl<'a, R: Rng, S> GenCtx<'a, R, S> {
    pub fn new(
        rng: &'a mut R,
        templates: &'a dyn TemplateSource,
        settings: &'a GenSettings,
        state: S,
    ) -> Self {
        Self {
            rng,
            templates,
            settings,
            state,
            lineages: Store::default(),
            stats: GenStats::default(),
        }
    }

    pub fn template(&self, id: &str) -> Result<Arc<Template>, Error> { load_template(self.templates, id) }

    /// Lineage for pieces that do not grow out of any other piece.
    pub fn root_lineage(&mut self) -> Id<Lineage> {
        self.lineages.insert(Lineage {
            parent: None,
            depth: 0,
        })
    }
}

/// Pieces generated by one section, not yet part of the structure.
pub struct Batch {
    lineage: Id<Lineage>,
    depth: u32,
    pieces: Vec<Piece>,
}

impl Batch {
    pub fn new(lineage: Id<Lineage>, depth: u32) -> Self {
        Self {
            lineage,
            depth,
            pieces: Vec::new(),
        }
    }

    pub fn lineage(&self) -> Id<Lineage> { self.lineage }

    pub fn depth(&self) -> u32 { self.depth }

    /// Add a piece to the batch and return the frame children attach to.
    pub fn push(&mut self, mut piece: Piece) -> Socket {
        piece.lineage = Some(self.lineage);
        piece.depth = self.depth;
        let socket = piece.socket();
        self.pieces.push(piece);
        socket
    }

    pub fn pieces(&self) -> &[Piece] { &self.pieces }

    pub fn len(&self) -> usize { self.pieces.len() }

    pub fn is_empty(&self) -> bool { self.pieces.is_empty() }

    /// The pieces of this batch, for expansions that nest inside it. Pieces
    /// those expansions accept keep their own lineage.
    pub fn nested(&mut self) -> &mut Vec<Piece> { &mut self.pieces }

    pub fn into_pieces(self) -> Vec<Piece> { self.pieces }
}

pub trait Section {
    /// Shared state of every section of one structure.
    type State;

    /// Expansions deeper than this are refused.
    const MAX_DEPTH: u32 = 8;

    /// Append the pieces of this section to `out`, attached to `parent`
    /// (optionally displaced by `offset` in the parent's frame). `placed` are
    /// the pieces already accepted around it. Returning `Ok(false)` discards
    /// the batch.
    fn generate<R: Rng>(
        &self,
        ctx: &mut GenCtx<'_, R, Self::State>,
        depth: u32,
        parent: Socket,
        offset: Option<Vec3<i32>>,
        placed: &[Piece],
        out: &mut Batch,
    ) -> Result<bool, Error>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    DepthExceeded,
    /// The batch overlapped a piece it had no right to touch.
    Collision { batch: usize },
    Declined,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Expansion {
    /// The number of pieces appended.
    Accepted(usize),
    Rejected(Rejection),
}

impl Expansion {
    pub fn is_accepted(&self) -> bool { matches!(self, Expansion::Accepted(_)) }
}

/// First pair of overlapping pieces, ignoring those that belong to `exempt`.
fn first_collision<'a>(
    batch: &'a [Piece],
    accepted: &'a [Piece],
    exempt: Option<Id<Lineage>>,
) -> Option<(&'a Piece, &'a Piece)> {
    batch.iter().find_map(|piece| {
        accepted
            .iter()
            .filter(|other| exempt.is_none() || other.lineage != exempt)
            .find(|other| other.bounds.intersects(&piece.bounds))
            .map(|other| (piece, other))
    })
}

/// Run `section` at `depth` and append its batch to `accepted` if it fits.
/// A rejected batch leaves `accepted` untouched.
pub fn expand<S: Section, R: Rng>(
    ctx: &mut GenCtx<'_, R, S::State>,
    section: &S,
    depth: u32,
    parent: Socket,
    offset: Option<Vec3<i32>>,
    accepted: &mut Vec<Piece>,
) -> Result<Expansion, Error> {
    if depth > S::MAX_DEPTH {
        ctx.stats.depth_exceeded += 1;
        trace!(depth, "Refusing to expand past the maximum depth");
        return Ok(Expansion::Rejected(Rejection::DepthExceeded));
    }

    let lineage = ctx.lineages.insert(Lineage {
        parent: parent.lineage,
        depth,
    });
    let mut batch = Batch::new(lineage, depth);
    ctx.stats.batches += 1;

    if !section.generate(ctx, depth, parent, offset, accepted.as_slice(), &mut batch)? {
        ctx.stats.declined += 1;
        trace!(depth, ?lineage, batch = batch.len(), "Section declined");
        return Ok(Expansion::Rejected(Rejection::Declined));
    }

    if let Some((piece, other)) = first_collision(batch.pieces(), accepted, parent.lineage) {
        ctx.stats.collisions += 1;
        trace!(
            depth,
            ?lineage,
            batch = batch.len(),
            piece = ?piece.bounds,
            other = ?other.bounds,
            "Rejected colliding batch"
        );
        return Ok(Expansion::Rejected(Rejection::Collision { batch: batch.len() }));
    }

    let n = batch.len();
    ctx.stats.accepted += n as u32;
    ctx.stats.deepest = ctx.stats.deepest.max(depth);
    accepted.extend(batch.into_pieces());
    Ok(Expansion::Accepted(n))
}

/// Grow a structure outwards from the pieces at `pending`. Pieces are taken
/// from the pending list in random order and every section `exits` returns
/// for them is expanded, queueing whatever gets accepted.
pub fn expand_breadth_first<S: Section, R: Rng>(
    ctx: &mut GenCtx<'_, R, S::State>,
    accepted: &mut Vec<Piece>,
    mut pending: Vec<usize>,
    exits: impl Fn(&Piece) -> Vec<S>,
) -> Result<(), Error> {
    while !pending.is_empty() {
        let idx = pending.swap_remove(ctx.rng.gen_range(0..pending.len()));
        let parent = accepted[idx].socket();
        for section in exits(&accepted[idx]) {
            let first = accepted.len();
            if expand(ctx, &section, parent.depth + 1, parent, None, accepted)?.is_accepted() {
                pending.extend(first..accepted.len());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{PieceKind, PieceState};
    use crate::site::fortress::{FortressKind, FortressPiece};
    use common::{terrain::TemplateManager, util::seeded_rng};

    fn block_at(pos: Vec3<i32>) -> Piece {
        Piece::sized(
            PieceKind::Fortress(FortressPiece::new(FortressKind::Corridor)),
            pos,
            Orientation::IDENTITY,
            Vec3::new(4, 4, 4),
            PieceState::default(),
        )
    }

    /// Places one 4x4x4 box at a fixed offset from its parent, then recurses.
    struct Chain {
        step: Vec3<i32>,
        recurse: bool,
    }

    impl Section for Chain {
        type State = ();

        fn generate<R: Rng>(
            &self,
            ctx: &mut GenCtx<'_, R, ()>,
            depth: u32,
            parent: Socket,
            _offset: Option<Vec3<i32>>,
            _placed: &[Piece],
            out: &mut Batch,
        ) -> Result<bool, Error> {
            let socket = out.push(block_at(parent.attach(self.step)));
            if self.recurse {
                expand(ctx, self, depth + 1, socket, None, out.nested())?;
            }
            Ok(true)
        }
    }

    fn run<T>(f: impl FnOnce(&mut GenCtx<'_, rand_chacha::ChaChaRng, ()>) -> T) -> T {
        let templates = TemplateManager::new();
        let settings = GenSettings::default();
        let mut rng = seeded_rng(1);
        let mut ctx = GenCtx::new(&mut rng, &templates, &settings, ());
        f(&mut ctx)
    }

    #[test]
    fn overlapping_the_parent_lineage_is_allowed() {
        run(|ctx| {
            let lineage = ctx.root_lineage();
            let mut root = block_at(Vec3::zero());
            root.lineage = Some(lineage);
            let mut accepted = vec![root.clone()];
            let section = Chain {
                step: Vec3::new(2, 0, 0),
                recurse: false,
            };
            let res = expand(ctx, &section, 1, root.socket(), None, &mut accepted).unwrap();
            assert_eq!(res, Expansion::Accepted(1));
            assert_eq!(accepted.len(), 2);
            assert_ne!(accepted[1].lineage, accepted[0].lineage);
        });
    }

    #[test]
    fn overlapping_another_lineage_rolls_back() {
        run(|ctx| {
            let lineage = ctx.root_lineage();
            let mut root = block_at(Vec3::zero());
            root.lineage = Some(lineage);
            let mut accepted = vec![root.clone()];
            let section = Chain {
                step: Vec3::new(10, 0, 0),
                recurse: false,
            };
            expand(ctx, &section, 1, root.socket(), None, &mut accepted).unwrap();
            let before = accepted.clone();

            // Grown from the new piece, but reaching back into the root
            let sibling = Chain {
                step: Vec3::new(-8, 0, 0),
                recurse: false,
            };
            let parent = accepted[1].socket();
            let res = expand(ctx, &sibling, 2, parent, None, &mut accepted).unwrap();
            assert_eq!(res, Expansion::Rejected(Rejection::Collision { batch: 1 }));
            assert_eq!(accepted, before);
            assert_eq!(ctx.stats.collisions, 1);
        });
    }

    #[test]
    fn detached_sockets_may_not_overlap_untagged_pieces() {
        run(|ctx| {
            let mut accepted = vec![block_at(Vec3::zero())];
            let section = Chain {
                step: Vec3::new(2, 0, 0),
                recurse: false,
            };
            let parent = accepted[0].socket().detached();
            let res = expand(ctx, &section, 1, parent, None, &mut accepted).unwrap();
            assert_eq!(res, Expansion::Rejected(Rejection::Collision { batch: 1 }));
            assert_eq!(accepted.len(), 1);
        });
    }

    #[test]
    fn self_recursion_stops_at_max_depth() {
        run(|ctx| {
            let mut accepted = Vec::new();
            let section = Chain {
                step: Vec3::new(0, 0, 4),
                recurse: true,
            };
            let res = expand(
                ctx,
                &section,
                0,
                Socket::root(Vec3::zero(), Orientation::IDENTITY),
                None,
                &mut accepted,
            )
            .unwrap();
            assert_eq!(res, Expansion::Accepted(Chain::MAX_DEPTH as usize + 1));
            assert_eq!(ctx.stats.depth_exceeded, 1);
            assert_eq!(ctx.stats.deepest, Chain::MAX_DEPTH);
        });
    }

    #[test]
    fn too_deep_expansion_does_not_touch_the_list() {
        run(|ctx| {
            let mut accepted = vec![block_at(Vec3::zero())];
            let section = Chain {
                step: Vec3::new(0, 0, 4),
                recurse: false,
            };
            let res = expand(
                ctx,
                &section,
                Chain::MAX_DEPTH + 1,
                accepted[0].socket(),
                None,
                &mut accepted,
            )
            .unwrap();
            assert_eq!(res, Expansion::Rejected(Rejection::DepthExceeded));
            assert_eq!(accepted.len(), 1);
            assert!(ctx.lineages.is_empty());
        });
    }

    #[test]
    fn lineage_ancestry() {
        let mut lineages = Store::default();
        let a = lineages.insert(Lineage { parent: None, depth: 0 });
        let b = lineages.insert(Lineage {
            parent: Some(a),
            depth: 1,
        });
        let c = lineages.insert(Lineage {
            parent: Some(a),
            depth: 1,
        });
        assert!(descends_from(&lineages, b, a));
        assert!(descends_from(&lineages, b, b));
        assert!(!descends_from(&lineages, a, b));
        assert!(!descends_from(&lineages, c, b));
    }
}
