//! WGSL source generation for the terrain material.
//!
//! The generated shader reads height and control data through the region
//! map. Two feature flags change its shape:
//! - `surfaces`: texture array splatting with per-surface UV scale and tint,
//!   otherwise a flat checker pattern
//! - `noise`: procedural height outside painted regions, faded in with the
//!   region blend map

use std::fmt::Write;

use bevy::color::LinearRgba;
use bevy::math::{IVec2, Vec3, Vec4};

use super::settings::TerrainSettingsGpu;
use crate::storage::{MAX_REGIONS, REGION_MAP_SIZE};
use crate::surface::MAX_SURFACES;

/// Feature switches for [`generate_shader_code`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ShaderFeatures {
    pub surfaces: bool,
    pub noise: bool,
}

impl ShaderFeatures {
    pub fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.surfaces {
            flags |= TerrainSettingsGpu::FLAG_SURFACES_ENABLED;
        }
        if self.noise {
            flags |= TerrainSettingsGpu::FLAG_NOISE_ENABLED;
        }
        flags
    }
}

/// Packs region offsets two per `vec4`, the layout of the `region_offsets`
/// uniform. Always returns the full declared array length.
pub fn pack_region_offsets(offsets: &[IVec2]) -> Vec<Vec4> {
    let offsets = &offsets[..offsets.len().min(MAX_REGIONS)];
    let mut packed: Vec<Vec4> = offsets
        .chunks(2)
        .map(|pair| {
            let a = pair[0].as_vec2();
            let b = pair.get(1).map_or(bevy::math::Vec2::ZERO, |o| o.as_vec2());
            Vec4::new(a.x, a.y, b.x, b.y)
        })
        .collect();
    packed.resize(MAX_REGIONS.div_ceil(2), Vec4::ZERO);
    packed
}

/// Per-surface UV scales as the `texture_uv_scale_array` uniform.
pub fn pack_uv_scales(scales: &[Vec3]) -> Vec<Vec4> {
    pad_surface_array(scales.iter().map(|s| s.extend(0.0)))
}

/// Per-surface tints as the `texture_color_array` uniform.
pub fn pack_colors(colors: &[LinearRgba]) -> Vec<Vec4> {
    pad_surface_array(colors.iter().map(|c| Vec4::new(c.red, c.green, c.blue, c.alpha)))
}

fn pad_surface_array(values: impl Iterator<Item = Vec4>) -> Vec<Vec4> {
    let mut packed: Vec<Vec4> = values.take(MAX_SURFACES).collect();
    packed.resize(MAX_SURFACES, Vec4::ZERO);
    packed
}

/// Generates the terrain material shader.
pub fn generate_shader_code(features: ShaderFeatures) -> String {
    let mut code = String::with_capacity(8 * 1024);

    code.push_str("#import bevy_pbr::mesh_functions::get_world_from_local\n");
    code.push_str("#import bevy_pbr::view_transformations::position_world_to_clip\n\n");

    write_bindings(&mut code, features);
    write_region_functions(&mut code);
    if features.noise {
        write_noise_functions(&mut code);
    }
    write_height_function(&mut code, features);
    if features.surfaces {
        write_material_functions(&mut code);
    }
    write_vertex(&mut code);
    write_fragment(&mut code, features);

    code
}

fn write_bindings(code: &mut String, features: ShaderFeatures) {
    code.push_str(
        "struct TerrainSettings {
    terrain_height: f32,
    region_size: f32,
    region_pixel_size: f32,
    region_map_size: u32,
    noise_scale: f32,
    noise_height: f32,
    noise_blend_near: f32,
    noise_blend_far: f32,
    flags: u32,
    surface_count: u32,
    _padding0: u32,
    _padding1: u32,
}

",
    );

    code.push_str("@group(#{MATERIAL_BIND_GROUP}) @binding(100) var<uniform> settings: TerrainSettings;\n");
    code.push_str("@group(#{MATERIAL_BIND_GROUP}) @binding(101) var region_map: texture_2d<f32>;\n");
    let _ = writeln!(
        code,
        "@group(#{{MATERIAL_BIND_GROUP}}) @binding(102) var<uniform> region_offsets: array<vec4<f32>, {}>;",
        // Two offsets are packed per vec4 to satisfy uniform array stride.
        MAX_REGIONS.div_ceil(2)
    );
    code.push_str("@group(#{MATERIAL_BIND_GROUP}) @binding(103) var height_maps: texture_2d_array<f32>;\n");
    code.push_str("@group(#{MATERIAL_BIND_GROUP}) @binding(104) var control_maps: texture_2d_array<f32>;\n");
    code.push_str("@group(#{MATERIAL_BIND_GROUP}) @binding(105) var color_maps: texture_2d_array<f32>;\n");
    code.push_str("@group(#{MATERIAL_BIND_GROUP}) @binding(106) var map_sampler: sampler;\n");

    if features.surfaces {
        code.push_str("@group(#{MATERIAL_BIND_GROUP}) @binding(107) var texture_array_albedo: texture_2d_array<f32>;\n");
        code.push_str("@group(#{MATERIAL_BIND_GROUP}) @binding(108) var texture_array_normal: texture_2d_array<f32>;\n");
        code.push_str("@group(#{MATERIAL_BIND_GROUP}) @binding(109) var texture_sampler: sampler;\n");
        let _ = writeln!(
            code,
            "@group(#{{MATERIAL_BIND_GROUP}}) @binding(110) var<uniform> texture_uv_scale_array: array<vec4<f32>, {MAX_SURFACES}>;"
        );
        let _ = writeln!(
            code,
            "@group(#{{MATERIAL_BIND_GROUP}}) @binding(111) var<uniform> texture_color_array: array<vec4<f32>, {MAX_SURFACES}>;"
        );
    }

    if features.noise {
        code.push_str("@group(#{MATERIAL_BIND_GROUP}) @binding(112) var region_blend_map: texture_2d<f32>;\n");
    }
    code.push('\n');
}

fn write_region_functions(code: &mut String) {
    let _ = write!(
        code,
        "const REGION_MAP_SIZE: i32 = {REGION_MAP_SIZE};

fn region_offset(index: i32) -> vec2<f32> {{
    let packed = region_offsets[index / 2];
    return select(packed.xy, packed.zw, (index % 2) == 1);
}}

// Region index at a world uv, -1 if there is no region.
fn region_index(uv: vec2<f32>) -> i32 {{
    let cell = vec2<i32>(floor(uv)) + vec2<i32>(REGION_MAP_SIZE / 2);
    if (any(cell < vec2<i32>(0)) || any(cell >= vec2<i32>(REGION_MAP_SIZE))) {{
        return -1;
    }}
    return i32(round(textureLoad(region_map, cell, 0).r * 255.0)) - 1;
}}

// World uv to texel coordinates inside the region, plus the region index.
fn get_region(uv: vec2<f32>) -> vec3<i32> {{
    let index = region_index(uv);
    let texel = vec2<i32>((uv - region_offset(max(index, 0))) * settings.region_size);
    return vec3<i32>(texel, index);
}}

// World uv to normalized uv inside the region, plus the region index.
fn get_regionf(uv: vec2<f32>) -> vec3<f32> {{
    let index = region_index(uv);
    return vec3<f32>(uv - region_offset(max(index, 0)), f32(index));
}}

"
    );
}

fn write_noise_functions(code: &mut String) {
    code.push_str(
        "fn hashv2(v: vec2<f32>) -> f32 {
    return fract(1e4 * sin(17.0 * v.x + v.y * 0.1) * (0.1 + abs(sin(v.y * 13.0 + v.x))));
}

fn noise2d(st: vec2<f32>) -> f32 {
    let i = floor(st);
    let f = fract(st);
    let a = hashv2(i);
    let b = hashv2(i + vec2<f32>(1.0, 0.0));
    let c = hashv2(i + vec2<f32>(0.0, 1.0));
    let d = hashv2(i + vec2<f32>(1.0, 1.0));
    let u = f * f * (3.0 - 2.0 * f);
    return mix(a, b, u.x) + (c - a) * u.y * (1.0 - u.x) + (d - b) * u.x * u.y;
}

",
    );
}

fn write_height_function(code: &mut String, features: ShaderFeatures) {
    code.push_str(
        "fn get_height(uv: vec2<f32>, linear: bool) -> f32 {
    var height = 0.5;
    let region = get_region(uv);
    if (region.z >= 0) {
        if (linear) {
            let regionf = get_regionf(uv);
            height = textureSampleLevel(height_maps, map_sampler, regionf.xy, region.z, 0.0).r;
        } else {
            height = textureLoad(height_maps, region.xy, region.z, 0).r;
        }
    }
",
    );
    if features.noise {
        code.push_str(
            "    let weight = textureSampleLevel(region_blend_map, map_sampler, uv / f32(REGION_MAP_SIZE) + 0.5, 0.0).r;
    height = mix(height, 0.5 + noise2d(uv * settings.noise_scale) * settings.noise_height,
        clamp(smoothstep(settings.noise_blend_near, settings.noise_blend_far, 1.0 - weight), 0.0, 1.0));
",
        );
    }
    code.push_str(
        "    return (height - 0.5) * settings.terrain_height;
}

",
    );
}

fn write_material_functions(code: &mut String) {
    code.push_str(
        "fn random(xy: vec2<f32>) -> f32 {
    return fract(sin(dot(xy, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

fn blend_weights(weight: f32, detail: f32) -> f32 {
    let w = sqrt(weight * 0.5);
    return max(0.1 * w, 10.0 * (w + detail) + 1.0 - (detail + 10.0));
}

fn depth_blend(a_value: vec4<f32>, a_bump: f32, b_value: vec4<f32>, b_bump: f32, t: f32) -> vec4<f32> {
    let ma = max(a_bump + (1.0 - t), b_bump + t) - 0.1;
    let ba = max(a_bump + (1.0 - t) - ma, 0.0);
    let bb = max(b_bump + t - ma, 0.0);
    return (a_value * ba + b_value * bb) / (ba + bb);
}

fn rotate(v: vec2<f32>, cosa: f32, sina: f32) -> vec2<f32> {
    return vec2<f32>(cosa * v.x - sina * v.y, sina * v.x + cosa * v.y);
}

struct MaterialSample {
    albedo: vec4<f32>,
    normal: vec4<f32>,
    weight: f32,
}

fn get_material(uv: vec2<f32>, control: vec4<f32>, uv_center: vec2<f32>, weight: f32) -> MaterialSample {
    let base = i32(round(control.r * 255.0));
    let overlay = i32(round(control.g * 255.0));
    let angle = random(uv_center) * 3.14159265;
    let rot = vec2<f32>(sin(angle), cos(angle));
    let mat_uv = rotate(uv, rot.x, rot.y) * texture_uv_scale_array[base].xy;

    var albedo = textureSample(texture_array_albedo, texture_sampler, mat_uv, base);
    var normal = textureSample(texture_array_normal, texture_sampler, mat_uv, base);
    if (control.b > 0.0) {
        let albedo2 = textureSample(texture_array_albedo, texture_sampler, mat_uv, overlay);
        let normal2 = textureSample(texture_array_normal, texture_sampler, mat_uv, overlay);
        albedo = depth_blend(albedo, albedo.a, albedo2, albedo2.a, control.b);
        normal = depth_blend(normal, albedo.a, normal2, albedo.a, control.b);
    }
    albedo = vec4<f32>(albedo.rgb * texture_color_array[base].rgb, albedo.a);

    var out: MaterialSample;
    out.weight = blend_weights(weight, albedo.a);
    out.albedo = albedo * out.weight;
    out.normal = normal * out.weight;
    return out;
}

",
    );
}

fn write_vertex(code: &mut String) {
    code.push_str(
        "struct Vertex {
    @builtin(instance_index) instance_index: u32,
    @location(0) position: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) region_uv: vec2<f32>,
}

@vertex
fn vertex(vertex: Vertex) -> VertexOutput {
    var out: VertexOutput;
    var world = (get_world_from_local(vertex.instance_index) * vec4<f32>(vertex.position, 1.0)).xyz;
    out.region_uv = world.xz / settings.region_size + 0.5;
    out.uv = world.xz * 0.5;
    world.y = get_height(out.region_uv, false);
    out.world_position = world;
    out.clip_position = position_world_to_clip(world);
    return out;
}

",
    );
}

fn write_fragment(code: &mut String, features: ShaderFeatures) {
    code.push_str(
        "@fragment
fn fragment(in: VertexOutput) -> @location(0) vec4<f32> {
    let px = settings.region_pixel_size;
    let left = get_height(in.region_uv + vec2<f32>(-px, 0.0), true);
    let right = get_height(in.region_uv + vec2<f32>(px, 0.0), true);
    let back = get_height(in.region_uv + vec2<f32>(0.0, -px), true);
    let fore = get_height(in.region_uv + vec2<f32>(0.0, px), true);
    let normal = normalize(cross(vec3<f32>(0.0, back - fore, 2.0), vec3<f32>(2.0, right - left, 0.0)));
    let light = clamp(dot(normal, normalize(vec3<f32>(0.3, 1.0, 0.2))), 0.1, 1.0);

",
    );

    if features.surfaces {
        code.push_str(
            "    let pos_texel = in.region_uv * settings.region_size + 0.5;
    let pos_texel00 = floor(pos_texel);
    let mirror_xy = fract(pos_texel00 * 0.5) * 2.0;
    let mirror_zw = vec2<f32>(1.0) - mirror_xy;

    let index00 = get_region((pos_texel00 + mirror_xy) * px);
    let index01 = get_region((pos_texel00 + vec2<f32>(mirror_xy.x, mirror_zw.y)) * px);
    let index10 = get_region((pos_texel00 + vec2<f32>(mirror_zw.x, mirror_xy.y)) * px);
    let index11 = get_region((pos_texel00 + mirror_zw) * px);

    let control00 = textureLoad(control_maps, index00.xy, max(index00.z, 0), 0);
    let control01 = textureLoad(control_maps, index01.xy, max(index01.z, 0), 0);
    let control10 = textureLoad(control_maps, index10.xy, max(index10.z, 0), 0);
    let control11 = textureLoad(control_maps, index11.xy, max(index11.z, 0), 0);

    var weights1 = clamp(pos_texel - pos_texel00, vec2<f32>(0.0), vec2<f32>(1.0));
    weights1 = mix(weights1, vec2<f32>(1.0) - weights1, mirror_xy);
    let weights0 = vec2<f32>(1.0) - weights1;

    let m00 = get_material(in.uv, control00, vec2<f32>(index00.xy), weights0.x * weights0.y);
    let m01 = get_material(in.uv, control01, vec2<f32>(index01.xy), weights0.x * weights1.y);
    let m10 = get_material(in.uv, control10, vec2<f32>(index10.xy), weights1.x * weights0.y);
    let m11 = get_material(in.uv, control11, vec2<f32>(index11.xy), weights1.x * weights1.y);

    let total_weight = 1.0 / (m00.weight + m01.weight + m10.weight + m11.weight);
    let color = (m00.albedo + m01.albedo + m10.albedo + m11.albedo).rgb * total_weight;
    return vec4<f32>(color * light, 1.0);
}
",
        );
    } else {
        code.push_str(
            "    let p = in.uv * 4.0;
    let w = max(abs(dpdx(p)), abs(dpdy(p))) + 0.01;
    let i = 2.0 * (abs(fract((p - 0.5 * w) / 2.0) - 0.5) - abs(fract((p + 0.5 * w) / 2.0) - 0.5)) / w;
    let checker = (0.5 - 0.5 * i.x * i.y) * 0.2 + 0.2;
    return vec4<f32>(vec3<f32>(checker * light), 1.0);
}
",
        );
    }
}
