//! Crease refinement: Chaikin subdivision of the sharpness chains.
//!
//! Each edge emits two child creases at slots `[2e, 2e + 2)`. Child
//! sharpness is the 1:3 weighted average with the chained neighbor,
//! minus one, clamped at zero, which is the DeRose semi-sharp rule:
//! sharpness decays by one per level while being smeared along the
//! feature curve. The `t1`/`t2` reciprocity flags keep the child chain
//! links consistent when neighboring edges run in opposite directions.
//!
//! The interior edges each refinement step creates are left with their
//! default smooth, self-linked creases.

use rayon::prelude::*;

use super::Subd;

/// Refine the cage's creases into level 1.
pub(crate) fn refine_cage_creases(subd: &mut Subd<'_>) {
    let cage = subd.topo.cage;
    let edge_count = cage.edge_count() as usize;
    let out = &mut subd.topo.creases[..2 * edge_count];

    out.par_chunks_exact_mut(2)
        .enumerate()
        .for_each(|(id, children)| {
            let edge = id as i32;
            let next = cage.crease_next(edge);
            let prev = cage.crease_prev(edge);
            let t1 = cage.crease_prev(next) == edge && next != edge;
            let t2 = cage.crease_next(prev) == edge && prev != edge;
            let weighted = 3.0 * cage.sharpness(edge);
            let next_sharpness = cage.sharpness(next);
            let prev_sharpness = cage.sharpness(prev);

            children[0].next = 2 * edge + 1;
            children[1].next = 2 * next + i32::from(!t1);

            children[0].prev = 2 * prev + i32::from(t2);
            children[1].prev = 2 * edge;

            children[0].sharpness = ((prev_sharpness + weighted) / 4.0 - 1.0).max(0.0);
            children[1].sharpness = ((weighted + next_sharpness) / 4.0 - 1.0).max(0.0);
        });
}

/// Refine level `depth` creases into level `depth + 1`.
pub(crate) fn refine_creases(subd: &mut Subd<'_>, depth: i32) {
    let cage = subd.topo.cage;
    let crease_count = cage.crease_count_at_depth(depth) as usize;
    let level_start = subd.topo.crease_offsets[depth as usize - 1];
    let out_start = subd.topo.crease_offsets[depth as usize];

    let (head, out) = subd.topo.creases.split_at_mut(out_start);
    let level = &head[level_start..];
    let out = &mut out[..2 * crease_count];

    out.par_chunks_exact_mut(2)
        .enumerate()
        .for_each(|(id, children)| {
            let edge = id as i32;
            let next = level[id].next;
            let prev = level[id].prev;
            let t1 = level[next as usize].prev == edge && next != edge;
            let t2 = level[prev as usize].next == edge && prev != edge;
            let weighted = 3.0 * level[id].sharpness;
            let next_sharpness = level[next as usize].sharpness;
            let prev_sharpness = level[prev as usize].sharpness;

            children[0].next = 2 * edge + 1;
            children[1].next = 2 * next + i32::from(!t1);

            children[0].prev = 2 * prev + i32::from(t2);
            children[1].prev = 2 * edge;

            children[0].sharpness = ((prev_sharpness + weighted) / 4.0 - 1.0).max(0.0);
            children[1].sharpness = ((weighted + next_sharpness) / 4.0 - 1.0).max(0.0);
        });
}
