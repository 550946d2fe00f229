use glam::{IVec3, Vec3};

// Keeps a flush-against-a-face body from registering the neighboring cell.
const CELL_EPSILON: f32 = 1e-4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Face {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

#[derive(Debug, Copy, Clone)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    pub fn translated(&self, offset: Vec3) -> Aabb {
        Aabb {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

fn unit_cell(cell: IVec3) -> Aabb {
    let min = cell.as_vec3();
    Aabb {
        min,
        max: min + Vec3::ONE,
    }
}

/// Voxel cells overlapped by `aabb`, in ascending X, then Y, then Z order.
/// The first solid hit wins ties, so the scan order is load-bearing.
fn overlapped_cells(aabb: &Aabb) -> impl Iterator<Item = IVec3> {
    let min_x = aabb.min.x.floor() as i32;
    let max_x = (aabb.max.x - CELL_EPSILON).floor() as i32;
    let min_y = aabb.min.y.floor() as i32;
    let max_y = (aabb.max.y - CELL_EPSILON).floor() as i32;
    let min_z = aabb.min.z.floor() as i32;
    let max_z = (aabb.max.z - CELL_EPSILON).floor() as i32;

    (min_x..=max_x).flat_map(move |x| {
        (min_y..=max_y).flat_map(move |y| (min_z..=max_z).map(move |z| IVec3::new(x, y, z)))
    })
}

fn overlaps_solid(aabb: &Aabb, is_solid: &impl Fn(IVec3) -> bool) -> bool {
    overlapped_cells(aabb).any(|cell| is_solid(cell) && aabb.intersects(&unit_cell(cell)))
}

/// Shared collision shape for the player and mobs: an axis-aligned box of
/// `width` x `height` anchored at `position`, which is the top (eye) point.
/// Feet sit at `position.y - height`.
///
/// The body never reads chunks itself; solidity arrives through a query so
/// the same code serves the player controller and mob AI.
#[derive(Debug, Clone)]
pub struct KinematicBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub width: f32,
    pub height: f32,
    pub on_ground: bool,
    pub swimming: bool,
}

impl KinematicBody {
    pub fn new(position: Vec3, width: f32, height: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            width,
            height,
            on_ground: false,
            swimming: false,
        }
    }

    pub fn aabb(&self) -> Aabb {
        let half = self.width * 0.5;
        Aabb {
            min: Vec3::new(
                self.position.x - half,
                self.position.y - self.height,
                self.position.z - half,
            ),
            max: Vec3::new(
                self.position.x + half,
                self.position.y,
                self.position.z + half,
            ),
        }
    }

    /// Applies `delta` along one axis and resolves against the first solid
    /// cell the moved box overlaps. Callers integrate in Y, X, Z order per
    /// tick so ground state is settled before auto-step eligibility is
    /// checked. Gravity, buoyancy, and friction belong to the caller; this
    /// only resolves an already-intended displacement.
    pub fn move_axis(&mut self, axis: Axis, delta: f32, is_solid: &impl Fn(IVec3) -> bool) {
        match axis {
            Axis::X => self.position.x += delta,
            Axis::Y => self.position.y += delta,
            Axis::Z => self.position.z += delta,
        }

        let aabb = self.aabb();
        let half = self.width * 0.5;
        let foot_cell = (self.position.y - self.height).floor() as i32;

        for cell in overlapped_cells(&aabb) {
            if !is_solid(cell) || !aabb.intersects(&unit_cell(cell)) {
                continue;
            }

            match axis {
                Axis::Y => {
                    if delta < 0.0 {
                        // Rest exactly on top of the obstruction.
                        self.position.y = (cell.y + 1) as f32 + self.height;
                        self.velocity.y = 0.0;
                        self.on_ground = true;
                    } else {
                        self.position.y = cell.y as f32;
                    }
                }
                Axis::X => {
                    if self.try_step_up(cell, foot_cell, is_solid) {
                        return;
                    }
                    if delta > 0.0 {
                        self.position.x = cell.x as f32 - half;
                    } else {
                        self.position.x = (cell.x + 1) as f32 + half;
                    }
                }
                Axis::Z => {
                    if self.try_step_up(cell, foot_cell, is_solid) {
                        return;
                    }
                    if delta > 0.0 {
                        self.position.z = cell.z as f32 - half;
                    } else {
                        self.position.z = (cell.z + 1) as f32 + half;
                    }
                }
            }
            return;
        }

        if axis == Axis::Y {
            self.on_ground = false;
        }
    }

    // One-block ledges are walkable: if the obstruction sits exactly at foot
    // level and the whole box fits one block higher, snap up and let the
    // horizontal move stand.
    fn try_step_up(
        &mut self,
        obstruction: IVec3,
        foot_cell: i32,
        is_solid: &impl Fn(IVec3) -> bool,
    ) -> bool {
        if !self.on_ground || self.swimming || obstruction.y != foot_cell {
            return false;
        }

        let lifted = self.aabb().translated(Vec3::Y);
        if overlaps_solid(&lifted, is_solid) {
            return false;
        }

        self.position.y += 1.0;
        true
    }
}

/// Walks the voxel grid along a ray and returns the first solid cell plus the
/// face it was entered through. Used for block picking by the player
/// controller and mob targeting.
pub fn raycast_solid(
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    is_solid: &impl Fn(IVec3) -> bool,
) -> Option<(IVec3, Face)> {
    let mut current = origin.floor().as_ivec3();
    if is_solid(current) {
        return Some((current, Face::NegY));
    }

    let step = IVec3::new(
        direction.x.signum() as i32,
        direction.y.signum() as i32,
        direction.z.signum() as i32,
    );

    let t_for = |orig: f32, dir: f32, cell: i32, step: i32| -> f32 {
        if dir == 0.0 {
            f32::INFINITY
        } else {
            let next = if step > 0 { cell as f32 + 1.0 } else { cell as f32 };
            (next - orig) / dir
        }
    };

    let mut t_max = Vec3::new(
        t_for(origin.x, direction.x, current.x, step.x),
        t_for(origin.y, direction.y, current.y, step.y),
        t_for(origin.z, direction.z, current.z, step.z),
    );
    let t_delta = Vec3::new(
        if direction.x != 0.0 {
            1.0 / direction.x.abs()
        } else {
            f32::INFINITY
        },
        if direction.y != 0.0 {
            1.0 / direction.y.abs()
        } else {
            f32::INFINITY
        },
        if direction.z != 0.0 {
            1.0 / direction.z.abs()
        } else {
            f32::INFINITY
        },
    );

    loop {
        let (face, distance) = if t_max.x <= t_max.y && t_max.x <= t_max.z {
            current.x += step.x;
            t_max.x += t_delta.x;
            (
                if step.x > 0 { Face::NegX } else { Face::PosX },
                t_max.x - t_delta.x,
            )
        } else if t_max.y <= t_max.z {
            current.y += step.y;
            t_max.y += t_delta.y;
            (
                if step.y > 0 { Face::NegY } else { Face::PosY },
                t_max.y - t_delta.y,
            )
        } else {
            current.z += step.z;
            t_max.z += t_delta.z;
            (
                if step.z > 0 { Face::NegZ } else { Face::PosZ },
                t_max.z - t_delta.z,
            )
        };

        if !distance.is_finite() || distance > max_distance {
            return None;
        }

        if is_solid(current) {
            return Some((current, face));
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{IVec3, Vec3};

    use super::{raycast_solid, Aabb, Axis, Face, KinematicBody};

    // Flat world: solid at y <= 9 (surface at y = 10), with optional walls.
    fn flat_floor(cell: IVec3) -> bool {
        cell.y <= 9
    }

    fn grounded_body(x: f32, z: f32) -> KinematicBody {
        // Feet exactly on the surface, eye at the anchor.
        let mut body = KinematicBody::new(Vec3::new(x, 11.8, z), 0.6, 1.8);
        body.move_axis(Axis::Y, -0.01, &flat_floor);
        assert!(body.on_ground);
        body
    }

    #[test]
    fn aabb_collision_detection() {
        let a = Aabb {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        let b = Aabb {
            min: Vec3::new(0.5, 0.25, 0.5),
            max: Vec3::new(1.5, 1.25, 1.5),
        };
        let c = Aabb {
            min: Vec3::new(1.0, 1.0, 1.0),
            max: Vec3::new(2.0, 2.0, 2.0),
        };

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn falling_body_rests_exactly_on_the_surface() {
        let mut body = KinematicBody::new(Vec3::new(0.5, 12.3, 0.5), 0.6, 1.8);
        body.velocity.y = -5.0;

        body.move_axis(Axis::Y, -1.0, &flat_floor);

        assert!(body.on_ground);
        assert_eq!(body.velocity.y, 0.0);
        assert!((body.position.y - 11.8).abs() < 1e-5);
    }

    #[test]
    fn rising_body_stops_below_a_ceiling() {
        let ceiling = |cell: IVec3| cell.y >= 20 || flat_floor(cell);
        let mut body = KinematicBody::new(Vec3::new(0.5, 19.5, 0.5), 0.6, 1.8);

        body.move_axis(Axis::Y, 1.0, &ceiling);

        assert!((body.position.y - 20.0).abs() < 1e-5);
    }

    #[test]
    fn clearing_the_ground_resets_on_ground() {
        let mut body = grounded_body(0.5, 0.5);
        body.move_axis(Axis::Y, 0.5, &flat_floor);
        assert!(!body.on_ground);
    }

    #[test]
    fn auto_step_climbs_a_single_block_ledge() {
        let ledge = |cell: IVec3| flat_floor(cell) || (cell.x == 2 && cell.y == 10);
        let mut body = grounded_body(1.5, 0.5);

        body.move_axis(Axis::X, 0.4, &ledge);

        // Up exactly one block, horizontal move kept.
        assert!((body.position.y - 12.8).abs() < 1e-5);
        assert!((body.position.x - 1.9).abs() < 1e-5);
    }

    #[test]
    fn two_block_wall_clamps_flush_without_lifting() {
        let wall =
            |cell: IVec3| flat_floor(cell) || (cell.x == 2 && (cell.y == 10 || cell.y == 11));
        let mut body = grounded_body(1.5, 0.5);

        body.move_axis(Axis::X, 0.4, &wall);

        assert!((body.position.y - 11.8).abs() < 1e-5);
        assert!((body.position.x - 1.7).abs() < 1e-5);
    }

    #[test]
    fn swimming_disables_auto_step() {
        let ledge = |cell: IVec3| flat_floor(cell) || (cell.x == 2 && cell.y == 10);
        let mut body = grounded_body(1.5, 0.5);
        body.swimming = true;

        body.move_axis(Axis::X, 0.4, &ledge);

        assert!((body.position.y - 11.8).abs() < 1e-5);
        assert!((body.position.x - 1.7).abs() < 1e-5);
    }

    #[test]
    fn raycast_reports_first_solid_cell_and_entry_face() {
        let wall = |cell: IVec3| cell.x == 3;

        let hit = raycast_solid(Vec3::new(0.5, 0.5, 0.5), Vec3::X, 10.0, &wall);
        assert_eq!(hit, Some((IVec3::new(3, 0, 0), Face::NegX)));

        let miss = raycast_solid(Vec3::new(0.5, 0.5, 0.5), Vec3::X, 2.0, &wall);
        assert_eq!(miss, None);

        let down = raycast_solid(
            Vec3::new(0.5, 5.5, 0.5),
            Vec3::new(0.0, -1.0, 0.0),
            10.0,
            &|cell| cell.y <= 2,
        );
        assert_eq!(down, Some((IVec3::new(0, 2, 0), Face::PosY)));
    }
}
