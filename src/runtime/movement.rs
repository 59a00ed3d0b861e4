use glam::DVec3;

use crate::error::WorldError;
use crate::world::topology::Direction;

/// Flat-mode movement: cardinal moves shift one ground axis by the full
/// distance, diagonals split it evenly (distance/√2 per axis), Up/Down
/// move along z. North is +y, East is +x.
pub fn calculate_new_position(
    position: DVec3,
    direction: Direction,
    distance: f64,
) -> Result<DVec3, WorldError> {
    if distance <= 0.0 {
        return Err(WorldError::invariant(format!(
            "movement distance must be positive, got {}",
            distance
        )));
    }

    let diagonal = distance / std::f64::consts::SQRT_2;
    let delta = match direction {
        Direction::North => DVec3::new(0.0, distance, 0.0),
        Direction::South => DVec3::new(0.0, -distance, 0.0),
        Direction::East => DVec3::new(distance, 0.0, 0.0),
        Direction::West => DVec3::new(-distance, 0.0, 0.0),
        Direction::NorthEast => DVec3::new(diagonal, diagonal, 0.0),
        Direction::SouthEast => DVec3::new(diagonal, -diagonal, 0.0),
        Direction::SouthWest => DVec3::new(-diagonal, -diagonal, 0.0),
        Direction::NorthWest => DVec3::new(-diagonal, diagonal, 0.0),
        Direction::Up => DVec3::new(0.0, 0.0, distance),
        Direction::Down => DVec3::new(0.0, 0.0, -distance),
    };

    Ok(position + delta)
}
