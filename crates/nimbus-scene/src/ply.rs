//! Binary PLY import for 3D Gaussian Splatting scenes
//!
//! Reads the training-output PLY layout (binary little endian, one `vertex`
//! element whose float properties include position, SH-DC color, opacity
//! logit, log scales and an unnormalized quaternion) and applies the
//! normalization contract on the way in: exp on scales, sigmoid on opacity,
//! SH-DC to RGB, quaternion L2 normalization. Unknown float properties such
//! as normals and higher SH bands are skipped over.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{SceneError, SceneResult};
use crate::pack::PackedSplats;
use crate::splat::{normalize_quat, sh_dc_to_rgb, sigmoid, SplatCloud};

/// Upper bound on header lines before the file is declared malformed.
const MAX_HEADER_LINES: usize = 128;

/// Properties a splat PLY must carry.
const REQUIRED: [&str; 14] = [
    "x", "y", "z", "f_dc_0", "f_dc_1", "f_dc_2", "opacity", "scale_0", "scale_1", "scale_2",
    "rot_0", "rot_1", "rot_2", "rot_3",
];

struct PlyHeader {
    vertex_count: usize,
    /// Byte offset of each vertex property within one record.
    offsets: HashMap<String, usize>,
    /// Bytes per vertex record.
    stride: usize,
    /// Bytes consumed by the header itself.
    header_len: usize,
}

fn parse_header(bytes: &[u8]) -> SceneResult<PlyHeader> {
    let mut pos = 0usize;
    let mut lines = 0usize;
    let mut vertex_count = None;
    let mut offsets = HashMap::new();
    let mut stride = 0usize;
    let mut in_vertex_element = false;
    let mut saw_format = false;

    loop {
        let end = bytes[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| SceneError::InvalidPly("unterminated header".into()))?;
        let line = std::str::from_utf8(&bytes[pos..pos + end])
            .map_err(|_| SceneError::InvalidPly("non-UTF8 header line".into()))?
            .trim_end_matches('\r');
        pos += end + 1;

        if lines == 0 && line != "ply" {
            return Err(SceneError::InvalidPly("missing 'ply' magic".into()));
        }
        lines += 1;
        if lines > MAX_HEADER_LINES {
            return Err(SceneError::InvalidPly("header too long".into()));
        }

        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("ply") | Some("comment") | None => {}
            Some("format") => {
                if fields.next() != Some("binary_little_endian") {
                    return Err(SceneError::InvalidPly(
                        "only binary_little_endian PLY is supported".into(),
                    ));
                }
                saw_format = true;
            }
            Some("element") => {
                let name = fields.next().unwrap_or_default();
                if name == "vertex" {
                    let count: usize = fields
                        .next()
                        .and_then(|v| v.parse().ok())
                        .ok_or_else(|| SceneError::InvalidPly("bad vertex count".into()))?;
                    vertex_count = Some(count);
                    in_vertex_element = true;
                } else {
                    in_vertex_element = false;
                }
            }
            Some("property") => {
                if !in_vertex_element {
                    continue;
                }
                let ty = fields.next().unwrap_or_default();
                if ty != "float" && ty != "float32" {
                    return Err(SceneError::InvalidPly(format!(
                        "unsupported vertex property type '{ty}'"
                    )));
                }
                let name = fields
                    .next()
                    .ok_or_else(|| SceneError::InvalidPly("unnamed property".into()))?;
                offsets.insert(name.to_string(), stride);
                stride += 4;
            }
            Some("end_header") => break,
            Some(_) => {}
        }
    }

    if !saw_format {
        return Err(SceneError::InvalidPly("missing format line".into()));
    }
    let vertex_count =
        vertex_count.ok_or_else(|| SceneError::InvalidPly("missing vertex element".into()))?;
    for name in REQUIRED {
        if !offsets.contains_key(name) {
            return Err(SceneError::InvalidPly(format!("missing property '{name}'")));
        }
    }

    Ok(PlyHeader {
        vertex_count,
        offsets,
        stride,
        header_len: pos,
    })
}

#[inline]
fn read_f32(record: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        record[offset],
        record[offset + 1],
        record[offset + 2],
        record[offset + 3],
    ])
}

/// Parse a binary PLY byte buffer into a normalized [`SplatCloud`].
pub fn import_ply(bytes: &[u8]) -> SceneResult<SplatCloud> {
    let header = parse_header(bytes)?;
    if header.vertex_count == 0 {
        return Err(SceneError::EmptyScene);
    }

    let body = &bytes[header.header_len..];
    let needed = header.vertex_count * header.stride;
    if body.len() < needed {
        return Err(SceneError::InvalidPly(format!(
            "body holds {} bytes, {} vertices need {}",
            body.len(),
            header.vertex_count,
            needed
        )));
    }

    let off = |name: &str| header.offsets[name];
    let (ox, oy, oz) = (off("x"), off("y"), off("z"));
    let (odc0, odc1, odc2) = (off("f_dc_0"), off("f_dc_1"), off("f_dc_2"));
    let oop = off("opacity");
    let (os0, os1, os2) = (off("scale_0"), off("scale_1"), off("scale_2"));
    let (or0, or1, or2, or3) = (off("rot_0"), off("rot_1"), off("rot_2"), off("rot_3"));

    let mut cloud = SplatCloud::with_capacity(header.vertex_count);
    for record in body.chunks_exact(header.stride).take(header.vertex_count) {
        cloud
            .positions
            .push([read_f32(record, ox), read_f32(record, oy), read_f32(record, oz)]);
        cloud.scales.push([
            read_f32(record, os0).exp(),
            read_f32(record, os1).exp(),
            read_f32(record, os2).exp(),
        ]);
        cloud.rotations.push(normalize_quat([
            read_f32(record, or0),
            read_f32(record, or1),
            read_f32(record, or2),
            read_f32(record, or3),
        ]));
        cloud.opacities.push(sigmoid(read_f32(record, oop)));
        cloud.colors.push([
            sh_dc_to_rgb(read_f32(record, odc0)),
            sh_dc_to_rgb(read_f32(record, odc1)),
            sh_dc_to_rgb(read_f32(record, odc2)),
        ]);
    }

    Ok(cloud)
}

/// Load a scene file into packed form, dispatching on the extension:
/// `.ply` is imported and packed, `.splat` is adopted as-is.
pub fn load_scene_file(path: &Path) -> SceneResult<PackedSplats> {
    let bytes = std::fs::read(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("splat") => PackedSplats::from_bytes(&bytes),
        _ => {
            let cloud = import_ply(&bytes)?;
            cloud.validate()?;
            Ok(PackedSplats::pack(&cloud))
        }
    }
}
