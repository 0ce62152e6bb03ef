//! Vertex stage: culling, clipping and the screen transform

use glam::{IVec3, Mat4, Vec2, Vec3, Vec4};
use termcraft::meshing::{Mesh, Triangle, Vertex};
use termcraft::rendering::framebuffer::Grid;
use termcraft::rendering::rasterizer::Rasterizer;
use termcraft::rendering::shading::{ClipSpaceShader, PassthroughShader};
use termcraft::rendering::vertex_stage::{VertexStage, NEAR_W_EPS};
use termcraft::rendering::FragmentList;
use termcraft::voxel::{BlockRef, BlockType, Side};

/// Triangle given directly in clip space (w = 1).
fn clip_triangle(points: [Vec3; 3], block: BlockType) -> Triangle {
    let vertices = points.map(|p| Vertex::new(p, Vec2::ZERO));
    Triangle::new(vertices, BlockRef::new(block, IVec3::ZERO), Side::Front)
}

fn stage(show_both_faces: bool) -> VertexStage<'static> {
    VertexStage {
        shader: &PassthroughShader,
        view: Mat4::IDENTITY,
        projection: Mat4::IDENTITY,
        time: 0.0,
        show_both_faces,
        width: 20,
        height: 10,
    }
}

// Facing the camera once y points down the screen
const FRONT: [Vec3; 3] = [
    Vec3::new(-0.5, -0.5, 0.5),
    Vec3::new(-0.5, 0.5, 0.5),
    Vec3::new(0.5, -0.5, 0.5),
];

fn back() -> [Vec3; 3] {
    [FRONT[0], FRONT[2], FRONT[1]]
}

#[test]
fn visible_triangle_gets_screen_coordinates() {
    let mut mesh = Mesh::new();
    mesh.push(clip_triangle(FRONT, BlockType::Stone));
    let stats = stage(false).run(&mut mesh);

    assert_eq!(stats.triangles, 1);
    assert_eq!(stats.active_triangles, 1);
    let screens: Vec<Vec2> = mesh.triangles[0].vertices.iter().map(|v| v.screen).collect();
    assert_eq!(
        screens,
        vec![Vec2::new(5.0, 2.5), Vec2::new(5.0, 7.5), Vec2::new(15.0, 2.5)]
    );
}

#[test]
fn triangle_beyond_one_face_is_culled_and_yields_no_fragments() {
    for offset in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z * 1.5] {
        let points = FRONT.map(|p| p + offset * 2.0);
        let mut mesh = Mesh::new();
        mesh.push(clip_triangle(points, BlockType::Stone));
        let stats = stage(true).run(&mut mesh);
        assert_eq!(stats.active_triangles, 0, "offset {:?}", offset);

        let mut fragments = Grid::new(20, 10, FragmentList::new());
        let sampler = |_: BlockType, _: Side, _: Vec2| Vec4::ONE;
        assert_eq!(Rasterizer::new().rasterize(&mesh.triangles, &mut fragments, &sampler), 0);
    }
}

#[test]
fn triangle_spanning_the_view_is_kept() {
    // No vertex is inside the cube but the triangle covers it
    let mut mesh = Mesh::new();
    mesh.push(clip_triangle(
        [Vec3::new(-5.0, -5.0, 0.5), Vec3::new(-5.0, 5.0, 0.5), Vec3::new(5.0, -5.0, 0.5)],
        BlockType::Stone,
    ));
    assert_eq!(stage(false).run(&mut mesh).active_triangles, 1);
}

#[test]
fn backfaces_are_culled_for_opaque_materials_only() {
    let mut mesh = Mesh::new();
    mesh.push(clip_triangle(back(), BlockType::Stone));
    mesh.push(clip_triangle(back(), BlockType::Leaves));
    mesh.push(clip_triangle(back(), BlockType::Glass));
    let stats = stage(false).run(&mut mesh);

    assert_eq!(stats.triangles, 3);
    assert_eq!(stats.active_triangles, 2);
    assert!(mesh.triangles.iter().all(|t| t.block.block_type != BlockType::Stone));
}

#[test]
fn show_both_faces_keeps_opaque_backfaces() {
    let mut mesh = Mesh::new();
    mesh.push(clip_triangle(back(), BlockType::Stone));
    assert_eq!(stage(true).run(&mut mesh).active_triangles, 1);
}

#[test]
fn normals_are_recomputed_every_frame() {
    let mut mesh = Mesh::new();
    mesh.push(clip_triangle(FRONT, BlockType::Stone));
    mesh.triangles[0].world_normal = Vec3::splat(42.0);
    stage(false).run(&mut mesh);

    let tri = &mesh.triangles[0];
    assert!(tri.world_normal.normalize().abs_diff_eq(Vec3::NEG_Z, 1e-6));
    assert!(tri.view_normal.z < 0.0);
}

#[test]
fn vertex_shader_receives_frame_inputs() {
    let shift = |v: &mut Vertex, _: &Mat4, _: &Mat4, time: f32| {
        v.pos.x += time;
    };
    let mut mesh = Mesh::new();
    mesh.push(clip_triangle(FRONT, BlockType::Stone));
    VertexStage {
        shader: &shift,
        time: 0.25,
        ..stage(false)
    }
    .run(&mut mesh);

    assert_eq!(mesh.triangles[0].vertices[0].pos.x, -0.25);
}

#[test]
fn near_plane_crossing_splits_triangle() {
    // Looking down -Z with the camera inside the triangle's span
    let projection = Mat4::perspective_rh(90f32.to_radians(), 2.0, 0.1, 100.0);
    let world = [
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, -4.0),
        Vec3::new(-1.0, 1.0, -4.0),
    ];
    let mut mesh = Mesh::new();
    mesh.push(clip_triangle(world, BlockType::Glass));

    let stats = VertexStage {
        shader: &ClipSpaceShader,
        view: Mat4::IDENTITY,
        projection,
        time: 0.0,
        show_both_faces: true,
        width: 20,
        height: 10,
    }
    .run(&mut mesh);

    assert_eq!(stats.triangles, 2);
    assert_eq!(stats.active_triangles, 2);
    for tri in &mesh.triangles {
        for v in &tri.vertices {
            assert!(v.pos.w >= NEAR_W_EPS * 0.999, "w = {}", v.pos.w);
            assert!(v.screen.is_finite());
        }
    }
}

#[test]
fn triangle_behind_camera_is_dropped() {
    let mut mesh = Mesh::new();
    mesh.push(clip_triangle(
        [Vec3::new(-1.0, -1.0, 2.0), Vec3::new(1.0, -1.0, 3.0), Vec3::new(-1.0, 1.0, 2.0)],
        BlockType::Stone,
    ));
    let stats = VertexStage {
        shader: &ClipSpaceShader,
        view: Mat4::IDENTITY,
        projection: Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0),
        time: 0.0,
        show_both_faces: true,
        width: 8,
        height: 8,
    }
    .run(&mut mesh);
    assert_eq!(stats.active_triangles, 0);
    assert!(mesh.is_empty());
}

#[test]
fn cube_from_outside_shows_at_most_three_faces() {
    let mut mesh = Mesh::new();
    mesh.push_block(IVec3::new(-1, -1, -6), BlockType::Stone);

    let projection = Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
        * Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
    let view = Mat4::look_at_rh(Vec3::new(3.0, 3.0, 0.0), Vec3::new(-0.5, -0.5, -5.5), Vec3::Y);
    let stats = VertexStage {
        shader: &ClipSpaceShader,
        view,
        projection,
        time: 0.0,
        show_both_faces: false,
        width: 40,
        height: 40,
    }
    .run(&mut mesh);

    assert_eq!(stats.triangles, 12);
    assert_eq!(stats.active_triangles, 6);
    let sides: std::collections::HashSet<Side> = mesh.triangles.iter().map(|t| t.side).collect();
    assert_eq!(sides.len(), 3);
    for side in [Side::Right, Side::Top, Side::Front] {
        assert!(sides.contains(&side), "{:?} should be visible", side);
    }
}
