//! Live collision resolution, run on every drag-update tick.
//!
//! Orders the colliding cards by how much of the drop target they cover,
//! then nudges each to a free neighbor cell or, failing that, the nearest
//! reachable free region found by BFS. Cards that cannot be placed this tick
//! are left alone; the drop-time pass has the final word.

use log::debug;

use crate::constants::AVOID_ANIM_MS;
use crate::grid::OccupancyGrid;
use crate::types::{
    Animation, AnimationKind, AvoidanceContext, Card, Easing, GridRect, Move, Plan,
};

use super::state::{ActiveAvoid, AvoidanceState, LastMove};
use super::{dragged_rect, neighbor_candidates};

pub(super) fn on_drag_update(
    state: &mut AvoidanceState,
    ctx: &AvoidanceContext<'_>,
) -> Option<Plan> {
    let shadow = dragged_rect(ctx)?;
    let area_key = shadow.area_key();
    let now = ctx.now_ms;

    debug!(
        "drag target ({},{}) size {}x{}",
        shadow.x, shadow.y, shadow.w, shadow.h
    );

    let collisions: Vec<&Card> = ctx
        .cards
        .iter()
        .filter(|c| c.id != ctx.dragged.id && shadow.overlaps(&c.rect()))
        .collect();

    // Debounce: a card only becomes eligible once it has overlapped the
    // target continuously for the configured delay.
    for c in &collisions {
        state
            .overlap_start_ts
            .entry(c.id.clone())
            .or_insert(now);
    }
    state
        .overlap_start_ts
        .retain(|id, _| collisions.iter().any(|c| &c.id == id));
    let stable: Vec<&Card> = collisions
        .iter()
        .filter(|c| {
            state
                .overlap_start_ts
                .get(&c.id)
                .is_some_and(|ts| now - ts >= ctx.avoidance_delay_ms)
        })
        .copied()
        .collect();

    if stable.is_empty() {
        // The target moved to a different cell and nothing collides there:
        // walk any standing displacements back to where they came from.
        if !state.active_area_key.is_empty()
            && state.active_area_key != area_key
            && !state.active_avoid.is_empty()
        {
            let restores: Vec<Move> = state
                .active_avoid
                .iter()
                .map(|(id, info)| Move {
                    card_id: id.clone(),
                    to: info.orig,
                })
                .collect();
            debug!("target cleared, restoring {} displaced cards", restores.len());
            state.active_avoid.clear();
            state.active_area_key.clear();
            return Some(Plan {
                moves: restores,
                ..Default::default()
            });
        }
        state.active_area_key = area_key;
        return None;
    }

    // Occupancy from everything except the dragged card, plus standing
    // reservations, plus the drop target itself so displaced cards are never
    // routed onto it.
    let others: Vec<&Card> = ctx
        .cards
        .iter()
        .filter(|c| c.id != ctx.dragged.id)
        .collect();
    let mut occ = OccupancyGrid::build_refs(&others, ctx.columns);
    for res in state.reservations.values() {
        occ.mark_rect(*res);
    }
    occ.mark_rect(shadow);

    // Most-overlapped card first.
    let mut order: Vec<(&Card, i32)> = stable
        .iter()
        .map(|c| (*c, shadow.intersection_area(&c.rect())))
        .collect();
    order.sort_by(|a, b| b.1.cmp(&a.1));

    let mut moves: Vec<Move> = Vec::new();
    for (card, _) in order {
        let units = card.footprint();
        let mut chosen = neighbor_candidates(card.position).into_iter().find(|cand| {
            let rect = GridRect::at(*cand, units);
            !rect.overlaps(&shadow) && occ.can_place_rect(rect)
        });

        if chosen.is_none() {
            chosen = occ
                .bfs_nearest_default(card.position, units)
                .filter(|found| !GridRect::at(*found, units).overlaps(&shadow));
        }

        let Some(to) = chosen else {
            debug!("no free placement for {} this tick", card.id);
            continue;
        };

        // Skip re-emitting a move the card is already executing.
        if state
            .last_moves
            .get(&card.id)
            .is_some_and(|last| last.to == to)
        {
            continue;
        }

        let orig = *state
            .originals
            .entry(card.id.clone())
            .or_insert(card.position);
        moves.push(Move {
            card_id: card.id.clone(),
            to,
        });
        state.last_moves.insert(card.id.clone(), LastMove { to, ts: now });
        state.active_avoid.insert(
            card.id.clone(),
            ActiveAvoid {
                orig,
                moved: to,
                area_key: area_key.clone(),
            },
        );
        let rect = GridRect::at(to, units);
        state.reservations.insert(card.id.clone(), rect);
        occ.mark_rect(rect);
    }

    state.active_area_key = area_key;

    if moves.is_empty() {
        return None;
    }

    let animations = moves
        .iter()
        .map(|m| Animation {
            card_id: m.card_id.clone(),
            kind: AnimationKind::Translate,
            from: state
                .originals
                .get(&m.card_id)
                .copied()
                .unwrap_or(m.to),
            to: m.to,
            duration_ms: AVOID_ANIM_MS,
            easing: Easing::Decelerate,
        })
        .collect();

    debug!("avoidance plan with {} moves", moves.len());
    Some(Plan {
        moves,
        animations,
        drop_position: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CardSize, GridPos, PxRect};

    const UNIT: f32 = 36.0;
    const GAP: f32 = 20.0;

    fn card(id: &str, x: i32, y: i32, size: CardSize) -> Card {
        let mut c = Card::new(id, size, GridPos::new(x, y));
        c.id = id.to_string();
        c
    }

    fn rect_for_cell(x: i32, y: i32, units: crate::types::Units) -> PxRect {
        let cell = UNIT + GAP;
        PxRect {
            left: x as f32 * cell,
            top: y as f32 * cell,
            width: units.w as f32 * UNIT,
            height: units.h as f32 * UNIT,
        }
    }

    fn ctx_at<'a>(
        cards: &'a [Card],
        dragged: &'a Card,
        x: i32,
        y: i32,
        now_ms: f64,
    ) -> AvoidanceContext<'a> {
        AvoidanceContext {
            columns: 12,
            gap: GAP,
            unit: UNIT,
            dragged,
            drop_rect: Some(rect_for_cell(x, y, dragged.footprint())),
            drop_target: Some(GridPos::new(x, y)),
            cards,
            now_ms,
            avoidance_delay_ms: 0.0,
        }
    }

    #[test]
    fn test_colliding_card_moves_to_adjacent_free_cell() {
        let cards = vec![
            card("d", 6, 6, CardSize::Wide),
            card("a", 0, 0, CardSize::Wide),
        ];
        let mut state = AvoidanceState::default();
        let plan = on_drag_update(&mut state, &ctx_at(&cards, &cards[0], 0, 0, 1000.0))
            .expect("collision should produce a plan");

        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].card_id, "a");
        let to = plan.moves[0].to;
        // An adjacent free cell clear of the 2x2 target at the origin.
        assert!(to == GridPos::new(0, 2) || to == GridPos::new(2, 0));
        assert!(!GridRect { x: to.x, y: to.y, w: 2, h: 2 }
            .overlaps(&GridRect { x: 0, y: 0, w: 2, h: 2 }));
        assert_eq!(plan.animations.len(), 1);
        assert_eq!(plan.animations[0].from, GridPos::new(0, 0));
        assert_eq!(plan.animations[0].to, to);
    }

    #[test]
    fn test_repeated_update_is_idempotent() {
        let mut cards = vec![
            card("d", 6, 6, CardSize::Wide),
            card("a", 0, 0, CardSize::Wide),
        ];
        let mut state = AvoidanceState::default();
        let before = cards.clone();
        let first = on_drag_update(&mut state, &ctx_at(&before, &before[0], 0, 0, 1000.0))
            .expect("first resolution produces moves");
        // The grid model applies the moves before the next tick.
        for m in &first.moves {
            if let Some(c) = cards.iter_mut().find(|c| c.id == m.card_id) {
                c.position = m.to;
            }
        }
        // Same drop rectangle again: nothing further to do.
        let second = on_drag_update(&mut state, &ctx_at(&cards, &cards[0], 0, 0, 1016.0));
        assert!(second.is_none());
    }

    #[test]
    fn test_no_collision_returns_none() {
        let cards = vec![
            card("d", 6, 6, CardSize::Wide),
            card("a", 0, 0, CardSize::Small),
        ];
        let mut state = AvoidanceState::default();
        let plan = on_drag_update(&mut state, &ctx_at(&cards, &cards[0], 8, 8, 1000.0));
        assert!(plan.is_none());
        assert_eq!(state.active_area_key, "8,8,2,2");
    }

    #[test]
    fn test_moving_away_restores_displaced_cards() {
        let cards = vec![
            card("d", 6, 6, CardSize::Wide),
            card("a", 0, 0, CardSize::Wide),
        ];
        let mut state = AvoidanceState::default();
        on_drag_update(&mut state, &ctx_at(&cards, &cards[0], 0, 0, 1000.0)).unwrap();
        assert!(!state.active_avoid.is_empty());

        // Target now far away with no collisions: a restore plan comes back.
        let plan = on_drag_update(&mut state, &ctx_at(&cards, &cards[0], 8, 8, 1100.0))
            .expect("stale displacements should be restored");
        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].card_id, "a");
        assert_eq!(plan.moves[0].to, GridPos::new(0, 0));
        assert!(state.active_avoid.is_empty());
        assert!(state.active_area_key.is_empty());
    }

    #[test]
    fn test_most_overlapped_resolved_first() {
        // "a" shares two cells with the 2x2 target, "b" only clips one.
        let cards = vec![
            card("d", 8, 8, CardSize::Wide),
            card("a", 0, 0, CardSize::Medium),
            card("b", 1, 1, CardSize::Wide),
        ];
        let mut state = AvoidanceState::default();
        let plan = on_drag_update(&mut state, &ctx_at(&cards, &cards[0], 0, 0, 1000.0)).unwrap();
        assert!(plan.moves.len() >= 2);
        assert_eq!(plan.moves[0].card_id, "a");
    }

    #[test]
    fn test_displaced_cards_never_share_cells() {
        // Three smalls under the target must land on three distinct cells.
        let cards = vec![
            card("d", 8, 8, CardSize::Wide),
            card("a", 0, 0, CardSize::Small),
            card("b", 1, 0, CardSize::Small),
            card("c", 0, 1, CardSize::Small),
        ];
        let mut state = AvoidanceState::default();
        let plan = on_drag_update(&mut state, &ctx_at(&cards, &cards[0], 0, 0, 1000.0)).unwrap();
        assert_eq!(plan.moves.len(), 3);
        let shadow = GridRect { x: 0, y: 0, w: 2, h: 2 };
        for (i, a) in plan.moves.iter().enumerate() {
            let ra = GridRect { x: a.to.x, y: a.to.y, w: 1, h: 1 };
            assert!(!ra.overlaps(&shadow), "{} landed on the target", a.card_id);
            for b in plan.moves.iter().skip(i + 1) {
                let rb = GridRect { x: b.to.x, y: b.to.y, w: 1, h: 1 };
                assert!(!ra.overlaps(&rb), "{} and {} collide", a.card_id, b.card_id);
            }
        }
    }

    #[test]
    fn test_overlap_debounce_defers_displacement() {
        let cards = vec![
            card("d", 6, 6, CardSize::Wide),
            card("a", 0, 0, CardSize::Wide),
        ];
        let mut state = AvoidanceState::default();
        let mut ctx = ctx_at(&cards, &cards[0], 0, 0, 1000.0);
        ctx.avoidance_delay_ms = 100.0;

        // First sight of the overlap: not yet stable.
        assert!(on_drag_update(&mut state, &ctx).is_none());
        // Still inside the debounce window.
        ctx.now_ms = 1050.0;
        assert!(on_drag_update(&mut state, &ctx).is_none());
        // Window elapsed: the displacement fires.
        ctx.now_ms = 1100.0;
        assert!(on_drag_update(&mut state, &ctx).is_some());
    }

    #[test]
    fn test_originals_survive_chained_displacement() {
        let cards = vec![
            card("d", 6, 6, CardSize::Wide),
            card("a", 0, 0, CardSize::Small),
        ];
        let mut state = AvoidanceState::default();
        on_drag_update(&mut state, &ctx_at(&cards, &cards[0], 0, 0, 1000.0)).unwrap();
        let orig = state.originals.get("a").copied().unwrap();
        assert_eq!(orig, GridPos::new(0, 0));

        // Simulate the card having been moved, then displaced again from its
        // new spot: the recorded original must not change.
        let mut moved_cards = cards.clone();
        moved_cards[1].position = GridPos::new(2, 0);
        let plan = on_drag_update(&mut state, &ctx_at(&moved_cards, &moved_cards[0], 2, 0, 1200.0));
        assert!(plan.is_some());
        assert_eq!(state.originals.get("a").copied(), Some(GridPos::new(0, 0)));
    }

    #[test]
    fn test_fifty_cards_within_frame_budget() {
        let mut cards: Vec<Card> = (0..50)
            .map(|i| {
                card(
                    &format!("c{i}"),
                    i % 12,
                    i / 12,
                    if i % 2 == 0 { CardSize::Small } else { CardSize::Medium },
                )
            })
            .collect();
        cards.push(card("d", 5, 5, CardSize::Wide));
        let mut state = AvoidanceState::default();
        let dragged = cards.last().unwrap().clone();

        let t0 = std::time::Instant::now();
        let _ = on_drag_update(&mut state, &ctx_at(&cards, &dragged, 5, 1, 1000.0));
        assert!(
            t0.elapsed().as_millis() <= 20,
            "drag update took {:?}",
            t0.elapsed()
        );
    }
}
