use crate::types::{Direction, Vec2};

pub(super) fn manhattan(a: Vec2, b: Vec2) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

pub(super) fn seat_owner(active_players: usize, seat: usize) -> Option<usize> {
    if seat > 3 {
        return None;
    }
    match active_players {
        1 => Some(0),
        2 => Some(seat / 2),
        _ => Some(seat),
    }
}

pub(super) fn route_seat(active_players: usize, seat: usize, dir: Direction) -> Option<usize> {
    let owner = seat_owner(active_players, seat)?;
    let allowed = match active_players {
        1 => {
            let owned = match seat {
                0 => Direction::Up,
                1 => Direction::Down,
                2 => Direction::Left,
                _ => Direction::Right,
            };
            dir == owned
        }
        2 => dir.is_horizontal() == (seat % 2 == 1),
        _ => true,
    };
    allowed.then_some(owner)
}

pub(super) fn reverse_controls(dir: Direction, horizontal: bool, vertical: bool) -> Direction {
    if (horizontal && dir.is_horizontal()) || (vertical && !dir.is_horizontal()) {
        dir.opposite()
    } else {
        dir
    }
}
