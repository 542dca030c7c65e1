use glam::Vec2;
use motocol::*;

fn main() {
    env_logger::init();

    let mut col = CollisionSystem::new(CollisionConfig::default());
    col.set_dims(Vec2::ZERO, Vec2::new(40.0, 20.0))
        .expect("fresh system has no grid");

    // Ground, a ramp and a ledge
    col.define_line(Vec2::new(0.0, 2.0), Vec2::new(20.0, 2.0), 1.0);
    col.define_line(Vec2::new(20.0, 2.0), Vec2::new(30.0, 6.0), 0.8);
    col.define_line(Vec2::new(30.0, 6.0), Vec2::new(40.0, 6.0), 1.2);
    col.add_entity(1, Vec2::new(25.0, 5.0)).expect("key 1 is unused");

    let stats = col.stats();
    println!(
        "grid {}x{} cells of {:.2}x{:.2}, {} lines, {:.1}% empty",
        stats.grid_width,
        stats.grid_height,
        stats.cell_width,
        stats.cell_height,
        stats.total_lines,
        stats.percentage_of_empty_cells
    );

    for x in [5.0f32, 19.8, 25.0, 30.2] {
        let wheel = Vec2::new(x, 2.0 + 0.4 * (x - 20.0).max(0.0).min(10.0) + 0.3);
        let contacts = col.collide_circle(wheel, 0.5, 4);
        println!("wheel at ({:.2},{:.2}): {} contacts", wheel.x, wheel.y, contacts.len());
        for c in contacts {
            println!(
                "  p=({:.3},{:.3}) n=({:.2},{:.2}) depth={:.3} grip={:.2}",
                c.position.x, c.position.y, c.normal.x, c.normal.y, c.depth, c.surface.grip
            );
        }
    }

    let near = col.entities_near(Vec2::new(22.0, 2.0), Vec2::new(28.0, 8.0));
    println!("entities near the ramp: {:?}", near);
}
