//! Drop-time resolution and the rollback path.
//!
//! Runs once when the gesture is about to commit. Only the four neighbor
//! cells are tried (no BFS) to keep latency low; if any collision cannot be
//! resolved that way the whole displacement batch is rolled back so the grid
//! never commits an overlapping arrangement.

use log::debug;

use crate::constants::DROP_ANIM_MS;
use crate::grid::OccupancyGrid;
use crate::types::{
    Animation, AnimationKind, AvoidanceContext, Card, Easing, GridRect, Move, Plan,
};

use super::state::{ActiveAvoid, AvoidanceState};
use super::{dragged_rect, neighbor_candidates};

pub(super) fn on_before_drop(
    state: &mut AvoidanceState,
    ctx: &AvoidanceContext<'_>,
) -> Option<Plan> {
    let shadow = dragged_rect(ctx)?;
    let area_key = shadow.area_key();

    let collisions: Vec<&Card> = ctx
        .cards
        .iter()
        .filter(|c| c.id != ctx.dragged.id && shadow.overlaps(&c.rect()))
        .collect();

    if collisions.is_empty() {
        // Dropping on a clear cell while displacements from an earlier
        // target are still standing: walk them back.
        if !state.active_area_key.is_empty()
            && state.active_area_key != area_key
            && !state.active_avoid.is_empty()
        {
            let restores = drain_active_avoid(state);
            return Some(Plan {
                moves: restores,
                ..Default::default()
            });
        }
        return None;
    }

    // Displacements computed for a different target are stale; restore them
    // ahead of whatever this resolution produces.
    let mut pending_restores: Vec<Move> = Vec::new();
    if !state.active_area_key.is_empty()
        && state.active_area_key != area_key
        && !state.active_avoid.is_empty()
    {
        pending_restores = drain_active_avoid(state);
    }

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

    let mut moves: Vec<Move> = Vec::new();
    let mut unresolved = false;
    for card in &collisions {
        let units = card.footprint();
        let chosen = neighbor_candidates(card.position).into_iter().find(|cand| {
            let rect = GridRect::at(*cand, units);
            !rect.overlaps(&shadow) && occ.can_place_rect(rect)
        });
        let Some(to) = chosen else {
            debug!("{} has no free neighbor at drop time", card.id);
            unresolved = true;
            break;
        };
        state
            .originals
            .entry(card.id.clone())
            .or_insert(card.position);
        moves.push(Move {
            card_id: card.id.clone(),
            to,
        });
        occ.mark_rect(GridRect::at(to, units));
    }

    if unresolved {
        // Failure path: one card could not make room, so every displaced
        // card goes back where it started and the drop target reverts to the
        // dragged card's origin.
        let mut restores = pending_restores;
        for (id, orig) in state.originals.drain() {
            restores.push(Move {
                card_id: id,
                to: orig,
            });
        }
        debug!("unresolvable collision, rolling back {} cards", restores.len());
        state.reservations.clear();
        state.active_avoid.clear();
        state.active_area_key.clear();
        state.last_moves.clear();
        state.overlap_start_ts.clear();
        return Some(Plan {
            moves: restores,
            animations: Vec::new(),
            drop_position: state.drag_origin,
        });
    }

    state.active_area_key = area_key.clone();
    let animations: Vec<Animation> = moves
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
            duration_ms: DROP_ANIM_MS,
            easing: Easing::Decelerate,
        })
        .collect();
    for m in &moves {
        let orig = state
            .originals
            .get(&m.card_id)
            .copied()
            .unwrap_or(m.to);
        state.active_avoid.insert(
            m.card_id.clone(),
            ActiveAvoid {
                orig,
                moved: m.to,
                area_key: area_key.clone(),
            },
        );
    }

    let mut all_moves = pending_restores;
    all_moves.extend(moves);
    Some(Plan {
        moves: all_moves,
        animations,
        drop_position: None,
    })
}

/// Turns the active displacement set into restore moves and clears it.
fn drain_active_avoid(state: &mut AvoidanceState) -> Vec<Move> {
    let restores: Vec<Move> = state
        .active_avoid
        .iter()
        .map(|(id, info)| Move {
            card_id: id.clone(),
            to: info.orig,
        })
        .collect();
    state.active_avoid.clear();
    state.active_area_key.clear();
    restores
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

    fn ctx_at<'a>(
        cards: &'a [Card],
        dragged: &'a Card,
        x: i32,
        y: i32,
        columns: i32,
    ) -> AvoidanceContext<'a> {
        let cell = UNIT + GAP;
        let units = dragged.footprint();
        AvoidanceContext {
            columns,
            gap: GAP,
            unit: UNIT,
            dragged,
            drop_rect: Some(PxRect {
                left: x as f32 * cell,
                top: y as f32 * cell,
                width: units.w as f32 * UNIT,
                height: units.h as f32 * UNIT,
            }),
            drop_target: Some(GridPos::new(x, y)),
            cards,
            now_ms: 2000.0,
            avoidance_delay_ms: 0.0,
        }
    }

    #[test]
    fn test_resolves_collision_with_neighbor_cell() {
        let cards = vec![
            card("d", 6, 6, CardSize::Wide),
            card("a", 1, 0, CardSize::Small),
        ];
        let mut state = AvoidanceState::default();
        let plan = on_before_drop(&mut state, &ctx_at(&cards, &cards[0], 0, 0, 12))
            .expect("collision should resolve");
        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].card_id, "a");
        // Down is blocked by the 2x2 target; the first clear neighbor is
        // right of the card.
        assert_eq!(plan.moves[0].to, GridPos::new(2, 0));
        assert!(plan.drop_position.is_none());
        assert_eq!(plan.animations.len(), 1);
    }

    #[test]
    fn test_unresolvable_collision_rolls_back_everything() {
        // One column wide: a small card under a 1x2 target has no legal
        // neighbor (up/down stay inside the target column's footprint, and
        // left/right leave the grid).
        let mut dragged = card("d", 0, 5, CardSize::Small);
        dragged.units = Some(crate::types::Units { w: 1, h: 2 });
        let mut blocked = card("a", 0, 0, CardSize::Small);
        blocked.units = Some(crate::types::Units { w: 1, h: 2 });
        let cards = vec![dragged.clone(), blocked];

        let mut state = AvoidanceState::default();
        state.drag_origin = Some(GridPos::new(0, 5));
        // Pretend the live pass already displaced "a" once.
        state.originals.insert("a".into(), GridPos::new(0, 0));
        state
            .reservations
            .insert("a".into(), GridRect { x: 0, y: 0, w: 1, h: 2 });

        let plan = on_before_drop(&mut state, &ctx_at(&cards, &cards[0], 0, 0, 1))
            .expect("rollback plan expected");

        // Every card tracked in originals is restored to its original cell.
        assert!(plan
            .moves
            .iter()
            .any(|m| m.card_id == "a" && m.to == GridPos::new(0, 0)));
        // The dragged card is sent back to where the gesture began.
        assert_eq!(plan.drop_position, Some(GridPos::new(0, 5)));
        // Internal state is fully cleared.
        assert!(state.reservations.is_empty());
        assert!(state.originals.is_empty());
        assert!(state.active_avoid.is_empty());
        assert!(state.active_area_key.is_empty());
    }

    #[test]
    fn test_two_stacked_cards_with_no_room_roll_back() {
        // Two stacked smalls in a single column, target covering both, so
        // neither has a free neighbor.
        let mut dragged = card("d", 0, 5, CardSize::Small);
        dragged.units = Some(crate::types::Units { w: 1, h: 2 });
        let a = card("a", 0, 0, CardSize::Small);
        let b = card("b", 0, 1, CardSize::Small);
        let cards = vec![dragged, a, b];

        let mut state = AvoidanceState::default();
        state.drag_origin = Some(GridPos::new(0, 5));
        state.originals.insert("a".into(), GridPos::new(0, 0));
        state.originals.insert("b".into(), GridPos::new(0, 1));

        let plan = on_before_drop(&mut state, &ctx_at(&cards, &cards[0], 0, 0, 1))
            .expect("rollback plan expected");

        for (id, orig) in [("a", GridPos::new(0, 0)), ("b", GridPos::new(0, 1))] {
            assert!(
                plan.moves.iter().any(|m| m.card_id == id && m.to == orig),
                "{id} missing from rollback"
            );
        }
        assert!(state.active_avoid.is_empty());
    }

    #[test]
    fn test_clear_drop_with_stale_displacements_restores() {
        let cards = vec![
            card("d", 6, 6, CardSize::Wide),
            card("a", 0, 0, CardSize::Small),
        ];
        let mut state = AvoidanceState::default();
        state.active_area_key = "0,0,2,2".into();
        state.active_avoid.insert(
            "a".into(),
            ActiveAvoid {
                orig: GridPos::new(0, 0),
                moved: GridPos::new(0, 2),
                area_key: "0,0,2,2".into(),
            },
        );

        // Drop far away from both the stale target and the card.
        let plan = on_before_drop(&mut state, &ctx_at(&cards, &cards[0], 8, 8, 12))
            .expect("stale displacement should restore");
        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].to, GridPos::new(0, 0));
        assert!(state.active_avoid.is_empty());
    }

    #[test]
    fn test_no_collision_no_state_returns_none() {
        let cards = vec![
            card("d", 6, 6, CardSize::Wide),
            card("a", 0, 0, CardSize::Small),
        ];
        let mut state = AvoidanceState::default();
        assert!(on_before_drop(&mut state, &ctx_at(&cards, &cards[0], 8, 8, 12)).is_none());
    }

    #[test]
    fn test_success_records_active_avoid() {
        let cards = vec![
            card("d", 6, 6, CardSize::Wide),
            card("a", 1, 0, CardSize::Small),
        ];
        let mut state = AvoidanceState::default();
        on_before_drop(&mut state, &ctx_at(&cards, &cards[0], 0, 0, 12)).unwrap();
        let info = state.active_avoid.get("a").expect("displacement recorded");
        assert_eq!(info.orig, GridPos::new(1, 0));
        assert_eq!(info.moved, GridPos::new(2, 0));
        assert_eq!(state.active_area_key, "0,0,2,2");
    }
}
