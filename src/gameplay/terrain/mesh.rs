use super::*;

/// Converts a span-local, screen-space point (y grows downwards) into the mountain's local space.
pub(super) fn span_local(point: Vec2) -> Vec2 {
    Vec2::new(point.x, -point.y)
}

/// Filled ground body: the profile extruded straight down to the bottom of the viewport.
pub(super) fn build_ground_fill_mesh(profile: &[Vec2], viewport_height: f32) -> Mesh {
    let node_count = profile.len();
    let mut positions = Vec::with_capacity(node_count * 2);
    let mut normals = Vec::with_capacity(node_count * 2);
    let mut uvs = Vec::with_capacity(node_count * 2);
    let mut indices = Vec::with_capacity(node_count.saturating_sub(1) * 6);

    for point in profile.iter().copied().map(span_local) {
        positions.push([point.x, point.y, 0.0]);
        positions.push([point.x, -viewport_height, 0.0]);
        normals.push([0.0, 0.0, 1.0]);
        normals.push([0.0, 0.0, 1.0]);
        uvs.push([point.x, 0.0]);
        uvs.push([point.x, 1.0]);
    }

    push_strip_indices(&mut indices, node_count);
    assemble_mesh(positions, normals, uvs, indices)
}

/// Grass line: a band of `width` centered on the profile.
pub(super) fn build_grass_strip_mesh(profile: &[Vec2], width: f32) -> Mesh {
    let node_count = profile.len();
    let local: Vec<Vec2> = profile.iter().copied().map(span_local).collect();
    let half_width = width * 0.5;

    let mut positions = Vec::with_capacity(node_count * 2);
    let mut normals = Vec::with_capacity(node_count * 2);
    let mut uvs = Vec::with_capacity(node_count * 2);
    let mut indices = Vec::with_capacity(node_count.saturating_sub(1) * 6);

    let mut u_along = 0.0_f32;
    for index in 0..node_count {
        if index > 0 {
            u_along += (local[index] - local[index - 1]).length() / width.max(0.001);
        }
        let tangent = if node_count < 2 {
            Vec2::X
        } else if index == 0 {
            local[1] - local[0]
        } else if index + 1 == node_count {
            local[node_count - 1] - local[node_count - 2]
        } else {
            local[index + 1] - local[index - 1]
        };
        let normal = Vec2::new(-tangent.y, tangent.x).normalize_or_zero();
        let safe_normal = if normal.length_squared() <= f32::EPSILON {
            Vec2::Y
        } else {
            normal
        };

        let top = local[index] + safe_normal * half_width;
        let bottom = local[index] - safe_normal * half_width;
        positions.push([top.x, top.y, 0.0]);
        positions.push([bottom.x, bottom.y, 0.0]);
        normals.push([0.0, 0.0, 1.0]);
        normals.push([0.0, 0.0, 1.0]);
        uvs.push([u_along, 0.0]);
        uvs.push([u_along, 1.0]);
    }

    push_strip_indices(&mut indices, node_count);
    assemble_mesh(positions, normals, uvs, indices)
}

fn push_strip_indices(indices: &mut Vec<u32>, node_count: usize) {
    for index in 0..node_count.saturating_sub(1) {
        let base = (index * 2) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);
    }
}

fn assemble_mesh(
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
) -> Mesh {
    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 432.0),
            Vec2::new(120.0, 450.0),
            Vec2::new(260.0, 410.0),
        ]
    }

    #[test]
    fn ground_fill_reaches_the_viewport_bottom() {
        let mesh = build_ground_fill_mesh(&profile(), 720.0);
        let Some(positions) = mesh
            .attribute(Mesh::ATTRIBUTE_POSITION)
            .and_then(|values| values.as_float3())
        else {
            panic!("mesh should carry float3 positions");
        };

        assert_eq!(positions.len(), 6);
        assert_eq!(positions[0], [0.0, -432.0, 0.0]);
        assert_eq!(positions[1], [0.0, -720.0, 0.0]);
        assert_eq!(mesh.indices().map(|indices| indices.len()), Some(12));
    }

    #[test]
    fn grass_band_straddles_the_profile() {
        let mesh = build_grass_strip_mesh(&[Vec2::new(0.0, 100.0), Vec2::new(10.0, 100.0)], 15.0);
        let Some(positions) = mesh
            .attribute(Mesh::ATTRIBUTE_POSITION)
            .and_then(|values| values.as_float3())
        else {
            panic!("mesh should carry float3 positions");
        };

        assert_eq!(positions[0], [0.0, -92.5, 0.0]);
        assert_eq!(positions[1], [0.0, -107.5, 0.0]);
    }
}
