use approx::assert_relative_eq;
use glam::Vec2;
use motocol::*;

fn level(w: f32, h: f32) -> CollisionSystem {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut s = CollisionSystem::new(CollisionConfig::default());
    s.set_dims(Vec2::ZERO, Vec2::new(w, h)).unwrap();
    s
}

#[test]
fn single_wall() {
    let mut s = level(20.0, 20.0);
    s.define_line(Vec2::new(0.0, 10.0), Vec2::new(20.0, 10.0), 1.0);
    assert!(s.check_circle(Vec2::new(10.0, 9.0), 1.2));
    assert!(!s.check_circle(Vec2::new(10.0, 5.0), 1.0));
}

#[test]
fn corner_contact_is_merged() {
    let mut s = level(20.0, 20.0);
    s.define_line(Vec2::new(0.0, 5.0), Vec2::new(5.0, 5.0), 1.0);
    s.define_line(Vec2::new(5.0, 5.0), Vec2::new(5.0, 10.0), 1.0);
    let contacts = s.collide_circle(Vec2::new(5.0, 5.0), 1.0, 8);
    assert_eq!(contacts.len(), 1);
    let c = contacts[0];
    assert!((c.position - Vec2::new(5.0, 5.0)).length() < 0.1);
    assert_relative_eq!(c.normal.length(), 1.0, epsilon = 1e-5);
    assert_relative_eq!(c.depth, 1.0, epsilon = 1e-5);
}

#[test]
fn empty_grid_stats() {
    let s = level(64.0, 48.0);
    let st = s.stats();
    assert_eq!(st.percentage_of_empty_cells, 100.0);
    assert_eq!(st.total_lines, 0);
    assert_eq!((st.grid_width, st.grid_height), (16, 16));
    assert_relative_eq!(st.cell_width, 4.0);
    assert_relative_eq!(st.cell_height, 3.0);
}

#[test]
fn grid_sizing_stays_in_bounds() {
    for (w, h) in [(0.0, 0.0), (1.0, 500.0), (2.0, 2.0), (31.9, 32.0), (33.0, 7.0), (1e4, 3.0)] {
        let s = level(w, h);
        let st = s.stats();
        for (n, size) in [(st.grid_width, st.cell_width), (st.grid_height, st.cell_height)] {
            assert!((1..=16).contains(&n), "{w}x{h}: {n} cells");
            assert!(n == 1 || size >= 2.0, "{w}x{h}: {n} cells of {size}");
        }
    }
}

#[test]
fn contacts_have_unit_normals_and_bounded_depth() {
    let mut s = level(40.0, 40.0);
    // A closed box plus a diagonal
    let corners = [
        Vec2::new(5.0, 5.0),
        Vec2::new(35.0, 5.0),
        Vec2::new(35.0, 35.0),
        Vec2::new(5.0, 35.0),
    ];
    for i in 0..4 {
        s.define_line(corners[i], corners[(i + 1) % 4], 1.0);
    }
    s.define_line(Vec2::new(5.0, 5.0), Vec2::new(35.0, 35.0), 0.5);

    let mut seen = 0;
    for ix in 0..40 {
        for iy in 0..40 {
            let center = Vec2::new(ix as f32 + 0.37, iy as f32 + 0.61);
            let r = 0.3 + (ix + iy) as f32 % 5.0 * 0.4;
            for c in s.collide_circle(center, r, 8) {
                seen += 1;
                assert_relative_eq!(c.normal.length(), 1.0, epsilon = 1e-4);
                assert!(c.depth >= 0.0 && c.depth <= r + 1e-4, "depth {} r {}", c.depth, r);
            }
        }
    }
    assert!(seen > 0);
}

#[test]
fn collinear_vertex_is_not_doubled() {
    let mut s = level(20.0, 20.0);
    s.define_line(Vec2::new(0.0, 5.0), Vec2::new(5.0, 5.0), 1.0);
    s.define_line(Vec2::new(5.0, 5.0), Vec2::new(10.0, 5.0), 1.0);
    let contacts = s.collide_circle(Vec2::new(5.0, 5.5), 1.0, 8);
    assert!(!contacts.is_empty());
    for (i, a) in contacts.iter().enumerate() {
        for b in &contacts[i + 1..] {
            let d = (a.position - b.position).abs();
            assert!(d.x >= 0.1 || d.y >= 0.1, "{:?} vs {:?}", a.position, b.position);
        }
    }
}

#[test]
fn entity_round_trip_and_move() {
    let mut s = level(32.0, 32.0);
    s.add_entity(42, Vec2::new(3.0, 4.0)).unwrap();
    assert!(s.entities_near(Vec2::new(2.0, 3.0), Vec2::new(4.0, 5.0)).contains(&42));

    s.move_entity(42, Vec2::new(28.0, 27.0)).unwrap();
    assert!(s.entities_near(Vec2::new(27.0, 26.0), Vec2::new(29.0, 28.0)).contains(&42));
    assert!(!s.entities_near(Vec2::new(2.0, 3.0), Vec2::new(4.0, 5.0)).contains(&42));

    s.remove_entity(42).unwrap();
    assert!(!s.entities_near(Vec2::ZERO, Vec2::splat(32.0)).contains(&42));
}

#[test]
fn unknown_entities_are_errors() {
    let mut s = level(8.0, 8.0);
    let err = s.remove_entity(5).unwrap_err();
    assert!(matches!(err, CollisionError::EntityNotFound(5)));
    assert_eq!(err.to_string(), "entity 5 is not tracked");
    assert!(matches!(
        s.move_entity(5, Vec2::ONE),
        Err(CollisionError::EntityNotFound(5))
    ));
}

#[test]
fn config_file_drives_culling() {
    let cfg = CollisionConfig::from_toml_str("culling = \"one_sided\"\n").unwrap();
    let mut s = CollisionSystem::new(cfg);
    s.set_dims(Vec2::ZERO, Vec2::splat(20.0)).unwrap();
    s.define_line(Vec2::new(0.0, 10.0), Vec2::new(20.0, 10.0), 1.0);
    assert!(s.check_circle(Vec2::new(10.0, 10.5), 1.0));
    assert!(!s.check_circle(Vec2::new(10.0, 9.5), 1.0));
}

#[test]
fn system_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CollisionSystem>();
}
